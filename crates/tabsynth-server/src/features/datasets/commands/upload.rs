//! Upload dataset command
//!
//! Admits an uploaded CSV file into the registry. The file is validated
//! structurally before anything is written; the id is allocated, the file
//! stored and the record inserted while holding the registry write lock.

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tabsynth_engine::validator::{self, ValidationError};

use crate::context::AppContext;
use crate::features::shared::validation::{validate_filename, FilenameValidationError};
use crate::registry::RegistryError;
use crate::storage::StorageError;

#[derive(Debug, Clone)]
pub struct UploadDatasetCommand {
    pub owner_id: i64,
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDatasetResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadDatasetError {
    #[error("{0}")]
    Filename(#[from] FilenameValidationError),
    #[error("The uploaded file is empty")]
    ContentRequired,
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Request<Result<UploadDatasetResponse, UploadDatasetError>> for UploadDatasetCommand {}

impl UploadDatasetCommand {
    /// Extension first, then cheap checks on the name and payload, then the
    /// structural CSV checks.
    pub fn validate(&self) -> Result<(), UploadDatasetError> {
        if !validator::has_csv_extension(&self.filename) {
            return Err(ValidationError::WrongExtension.into());
        }
        validate_filename(&self.filename)?;
        if self.content.is_empty() {
            return Err(UploadDatasetError::ContentRequired);
        }
        let mut stream = Cursor::new(self.content.as_slice());
        validator::validate(&self.filename, &mut stream)?;
        Ok(())
    }
}

#[tracing::instrument(skip(ctx, command), fields(owner_id = command.owner_id, filename = %command.filename, bytes = command.content.len()))]
pub async fn handle(
    ctx: AppContext,
    command: UploadDatasetCommand,
) -> Result<UploadDatasetResponse, UploadDatasetError> {
    command.validate()?;

    let _guard = ctx.registry.lock_writes().await;
    let id = ctx.registry.next_identity().await?;
    let path = ctx.storage.save_upload(id, &command.filename, &command.content).await?;

    let dataset = match ctx
        .registry
        .register(id, &command.filename, &path, command.owner_id)
        .await
    {
        Ok(dataset) => dataset,
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                tracing::warn!(dataset_id = id, error = %cleanup, "Failed to remove unregistered upload");
            }
            return Err(e.into());
        },
    };

    tracing::info!(dataset_id = dataset.id, "Dataset uploaded");

    Ok(UploadDatasetResponse {
        id: dataset.id,
        name: dataset.name,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{create_user, test_context, SMALL_CSV};

    fn command(owner_id: i64, filename: &str, content: &str) -> UploadDatasetCommand {
        UploadDatasetCommand {
            owner_id,
            filename: filename.to_string(),
            content: content.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_ids_are_sequential_from_one() {
        let (_dir, ctx) = test_context().await;
        let owner = create_user(&ctx, "ada").await;

        for expected in 1..=3 {
            let response = handle(ctx.clone(), command(owner, "people.csv", SMALL_CSV))
                .await
                .unwrap();
            assert_eq!(response.id, expected);
            assert_eq!(response.name, "people.csv");
        }

        let stored = ctx.storage.layout().real_table(2, "people.csv");
        assert_eq!(std::fs::read_to_string(stored).unwrap(), SMALL_CSV);
    }

    #[tokio::test]
    async fn test_rejected_upload_stores_nothing() {
        let (dir, ctx) = test_context().await;
        let owner = create_user(&ctx, "ada").await;

        let err = handle(ctx.clone(), command(owner, "people.txt", SMALL_CSV))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadDatasetError::Validation(ValidationError::WrongExtension)));

        let err = handle(ctx.clone(), command(owner, "semi.csv", "a;b;c\n1;2;3\n4;5;6\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadDatasetError::Validation(ValidationError::Delimiter(';'))));

        let err = handle(ctx.clone(), command(owner, "../up.csv", SMALL_CSV))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadDatasetError::Filename(_)));

        let err = handle(ctx, command(owner, "empty.csv", "")).await.unwrap_err();
        assert!(matches!(err, UploadDatasetError::ContentRequired));

        assert_eq!(std::fs::read_dir(dir.path().join("data")).unwrap().count(), 0);
    }

    #[test]
    fn test_extension_is_checked_first() {
        for (filename, content) in [("x.txt", ""), ("", ""), ("../x.txt", SMALL_CSV)] {
            let err = command(1, filename, content).validate().unwrap_err();
            assert!(
                matches!(err, UploadDatasetError::Validation(ValidationError::WrongExtension)),
                "{filename}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_longest_name_round_trips_through_synthesis_paths() {
        let (_dir, ctx) = test_context().await;
        let owner = create_user(&ctx, "ada").await;
        let name = format!(
            "{}.csv",
            "x".repeat(crate::features::shared::validation::MAX_FILENAME_LENGTH - 4)
        );

        let response = handle(ctx.clone(), command(owner, &name, SMALL_CSV)).await.unwrap();
        let table = ctx
            .storage
            .read_real(&ctx.storage.layout().real_table(response.id, &name))
            .unwrap();
        ctx.storage.write_synthetic(response.id, &name, &table).unwrap();
        assert!(ctx.storage.synthetic_exists(response.id, &name));

        let err = handle(ctx, command(owner, &format!("x{name}"), SMALL_CSV))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadDatasetError::Filename(_)));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_get_distinct_ids() {
        let (_dir, ctx) = test_context().await;
        let owner = create_user(&ctx, "ada").await;

        let uploads: Vec<_> = (0..6)
            .map(|_| {
                let ctx = ctx.clone();
                tokio::spawn(async move { handle(ctx, command(owner, "p.csv", SMALL_CSV)).await })
            })
            .collect();
        let mut ids = Vec::new();
        for upload in uploads {
            ids.push(upload.await.unwrap().unwrap().id);
        }
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }
}
