use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::registry::RegistryError;
use crate::storage::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPlotQuery {
    pub dataset_id: i64,
    pub owner_id: i64,
    pub file: String,
}

#[derive(Debug, Clone)]
pub struct GetPlotResponse {
    pub content: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetPlotError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Request<Result<GetPlotResponse, GetPlotError>> for GetPlotQuery {}

#[tracing::instrument(skip(ctx))]
pub async fn handle(ctx: AppContext, query: GetPlotQuery) -> Result<GetPlotResponse, GetPlotError> {
    let dataset = ctx
        .registry
        .fetch_owned(query.dataset_id, query.owner_id)
        .await?;

    let content = ctx.storage.read_plot(dataset.id, &query.file).await?;
    Ok(GetPlotResponse { content })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{create_user, test_context, SMALL_CSV};

    #[tokio::test]
    async fn test_plot_requires_ownership() {
        let (_dir, ctx) = test_context().await;
        let owner = create_user(&ctx, "ada").await;
        let intruder = create_user(&ctx, "eve").await;
        let path = ctx.storage.save_upload(1, "p.csv", SMALL_CSV.as_bytes()).await.unwrap();
        ctx.registry.register(1, "p.csv", &path, owner).await.unwrap();
        std::fs::write(ctx.storage.layout().plot_path("1age.png"), b"png").unwrap();

        let query = |owner_id, file: &str| GetPlotQuery {
            dataset_id: 1,
            owner_id,
            file: file.to_string(),
        };

        let response = handle(ctx.clone(), query(owner, "1age.png")).await.unwrap();
        assert_eq!(response.content, b"png");

        let err = handle(ctx.clone(), query(intruder, "1age.png")).await.unwrap_err();
        assert!(matches!(err, GetPlotError::Registry(RegistryError::Forbidden)));

        let err = handle(ctx, query(owner, "../1age.png")).await.unwrap_err();
        assert!(matches!(err, GetPlotError::Storage(StorageError::InvalidPlotName(_))));
    }
}
