pub mod delete;
pub mod generate;
pub mod upload;

pub use delete::{DeleteDatasetCommand, DeleteDatasetError, DeleteDatasetResponse};
pub use generate::{GenerateSyntheticCommand, GenerateSyntheticError, GenerateSyntheticResponse};
pub use upload::{UploadDatasetCommand, UploadDatasetError, UploadDatasetResponse};
