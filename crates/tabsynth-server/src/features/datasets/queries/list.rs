use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::registry::RegistryError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDatasetsQuery {
    pub owner_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetItem {
    pub id: i64,
    pub name: String,
    pub has_synthetic: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDatasetsResponse {
    pub datasets: Vec<DatasetItem>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListDatasetsError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl Request<Result<ListDatasetsResponse, ListDatasetsError>> for ListDatasetsQuery {}

#[tracing::instrument(skip(ctx))]
pub async fn handle(
    ctx: AppContext,
    query: ListDatasetsQuery,
) -> Result<ListDatasetsResponse, ListDatasetsError> {
    let datasets = ctx
        .registry
        .list_for_owner(query.owner_id)
        .await?
        .into_iter()
        .map(|dataset| DatasetItem {
            has_synthetic: ctx.storage.synthetic_exists(dataset.id, &dataset.name),
            id: dataset.id,
            name: dataset.name,
            created_at: dataset.created_at,
        })
        .collect();

    Ok(ListDatasetsResponse { datasets })
}
