//! Generate synthetic data command
//!
//! Parses the flattened synthesis form into a typed request, checks ownership,
//! then fits and samples on the worker pool. The new synthetic table replaces
//! any previous one for the dataset.

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tabsynth_engine::synthesis::{Strategy, SynthesisError, SynthesisForm, SynthesisRequest};

use crate::context::{AppContext, WorkerError};
use crate::registry::RegistryError;
use crate::storage::StorageError;

#[derive(Debug, Clone)]
pub struct GenerateSyntheticCommand {
    pub dataset_id: i64,
    pub owner_id: i64,
    pub form: SynthesisForm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSyntheticResponse {
    pub dataset_id: i64,
    pub strategy: Strategy,
    pub columns: Vec<String>,
    pub row_count: usize,
    /// Leading rows of the synthetic table.
    pub preview: Vec<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateSyntheticError {
    #[error("{0}")]
    Synthesis(#[from] SynthesisError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    /// The real table vanished between lookup and read.
    #[error("The source table for this dataset no longer exists")]
    SourceMissing,
    #[error("Storage error: {0}")]
    Storage(StorageError),
    #[error("{0}")]
    Worker(#[from] WorkerError),
}

impl From<StorageError> for GenerateSyntheticError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => GenerateSyntheticError::SourceMissing,
            other => GenerateSyntheticError::Storage(other),
        }
    }
}

impl Request<Result<GenerateSyntheticResponse, GenerateSyntheticError>> for GenerateSyntheticCommand {}

#[tracing::instrument(skip(ctx, command), fields(dataset_id = command.dataset_id, owner_id = command.owner_id, strategy = %command.form.strategy))]
pub async fn handle(
    ctx: AppContext,
    command: GenerateSyntheticCommand,
) -> Result<GenerateSyntheticResponse, GenerateSyntheticError> {
    let request = SynthesisRequest::try_from(command.form)?;
    let strategy = request.strategy();
    let dataset = ctx
        .registry
        .fetch_owned(command.dataset_id, command.owner_id)
        .await?;

    let preview_rows = ctx.config.synthesis.preview_rows;
    let storage = ctx.storage.clone();
    let engine = ctx.engine.clone();
    let real_path = PathBuf::from(&dataset.path);
    let (id, name) = (dataset.id, dataset.name.clone());

    let synthetic = ctx
        .run_blocking(move || -> Result<_, GenerateSyntheticError> {
            let real = storage.read_real(&real_path)?;
            let synthetic = engine.synthesize(&real, &request)?;
            storage.write_synthetic(id, &name, &synthetic)?;
            Ok(synthetic)
        })
        .await??;

    tracing::info!(
        dataset_id = id,
        rows = synthetic.len(),
        "Synthetic table generated"
    );

    Ok(GenerateSyntheticResponse {
        dataset_id: id,
        strategy,
        columns: synthetic.columns().to_vec(),
        row_count: synthetic.len(),
        preview: synthetic.head(preview_rows).rows().to_vec(),
    })
}
