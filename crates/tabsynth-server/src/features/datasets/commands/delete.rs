use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::registry::RegistryError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDatasetCommand {
    pub id: i64,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDatasetResponse {
    pub id: i64,
    pub artifacts_removed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteDatasetError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl Request<Result<DeleteDatasetResponse, DeleteDatasetError>> for DeleteDatasetCommand {}

/// Removes the synthetic table, the plots, the record and the real table.
#[tracing::instrument(skip(ctx))]
pub async fn handle(
    ctx: AppContext,
    command: DeleteDatasetCommand,
) -> Result<DeleteDatasetResponse, DeleteDatasetError> {
    let dataset = ctx.registry.fetch_owned(command.id, command.owner_id).await?;

    let _guard = ctx.registry.lock_writes().await;
    let artifacts_removed = ctx.registry.delete(dataset.id).await?;

    Ok(DeleteDatasetResponse {
        id: dataset.id,
        artifacts_removed,
    })
}
