pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{
    DeleteDatasetCommand, DeleteDatasetError, DeleteDatasetResponse, GenerateSyntheticCommand,
    GenerateSyntheticError, GenerateSyntheticResponse, UploadDatasetCommand, UploadDatasetError,
    UploadDatasetResponse,
};
pub use queries::{
    DatasetItem, DownloadSyntheticError, DownloadSyntheticQuery, DownloadSyntheticResponse,
    EvaluateDatasetError, EvaluateDatasetQuery, EvaluateDatasetResponse, GetPlotError, GetPlotQuery,
    GetPlotResponse, ListDatasetsError, ListDatasetsQuery, ListDatasetsResponse,
};

pub use routes::datasets_routes;
