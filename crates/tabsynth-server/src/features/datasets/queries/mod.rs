pub mod download_synthetic;
pub mod evaluate;
pub mod list;
pub mod plot;

pub use download_synthetic::{DownloadSyntheticError, DownloadSyntheticQuery, DownloadSyntheticResponse};
pub use evaluate::{EvaluateDatasetError, EvaluateDatasetQuery, EvaluateDatasetResponse};
pub use list::{DatasetItem, ListDatasetsError, ListDatasetsQuery, ListDatasetsResponse};
pub use plot::{GetPlotError, GetPlotQuery, GetPlotResponse};
