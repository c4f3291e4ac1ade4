use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::registry::RegistryError;
use crate::storage::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSyntheticQuery {
    pub dataset_id: i64,
    pub owner_id: i64,
}

#[derive(Debug, Clone)]
pub struct DownloadSyntheticResponse {
    /// Name under which the stored file is offered, `<id>_s_<name>`.
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadSyntheticError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("No synthetic table exists for this dataset")]
    NotFound,
    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for DownloadSyntheticError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

impl Request<Result<DownloadSyntheticResponse, DownloadSyntheticError>> for DownloadSyntheticQuery {}

#[tracing::instrument(skip(ctx))]
pub async fn handle(
    ctx: AppContext,
    query: DownloadSyntheticQuery,
) -> Result<DownloadSyntheticResponse, DownloadSyntheticError> {
    let dataset = ctx
        .registry
        .fetch_owned(query.dataset_id, query.owner_id)
        .await?;

    let content = ctx.storage.synthetic_bytes(dataset.id, &dataset.name).await?;

    Ok(DownloadSyntheticResponse {
        filename: format!("{}_s_{}", dataset.id, dataset.name),
        content,
    })
}
