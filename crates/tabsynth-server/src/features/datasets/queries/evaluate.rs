//! Evaluate synthetic data query
//!
//! Compares the stored synthetic table against the real one and renders the
//! comparison plots. Plots are redrawn on every call so they always describe
//! the current synthetic table.

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tabsynth_engine::evaluation::{EvaluationError, QualityReport};
use tabsynth_engine::EngineError;

use crate::context::{AppContext, WorkerError};
use crate::registry::RegistryError;
use crate::storage::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateDatasetQuery {
    pub dataset_id: i64,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateDatasetResponse {
    pub dataset_id: i64,
    pub report: QualityReport,
    /// URLs of the rendered plots, in render order.
    pub plots: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluateDatasetError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("{0}")]
    ArtifactNotFound(EvaluationError),
    #[error("The source table for this dataset no longer exists")]
    SourceMissing,
    #[error("{0}")]
    SchemaMismatch(EvaluationError),
    #[error("Plot error: {0}")]
    Plot(#[source] EngineError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Worker(#[from] WorkerError),
}

impl From<EngineError> for EvaluateDatasetError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Evaluation(e @ EvaluationError::ArtifactNotFound) => Self::ArtifactNotFound(e),
            EngineError::Evaluation(e @ EvaluationError::SchemaMismatch { .. }) => Self::SchemaMismatch(e),
            other => Self::Plot(other),
        }
    }
}

impl Request<Result<EvaluateDatasetResponse, EvaluateDatasetError>> for EvaluateDatasetQuery {}

pub fn plot_url(dataset_id: i64, file_name: &str) -> String {
    format!("/api/v1/datasets/{dataset_id}/plots/{file_name}")
}

#[tracing::instrument(skip(ctx))]
pub async fn handle(
    ctx: AppContext,
    query: EvaluateDatasetQuery,
) -> Result<EvaluateDatasetResponse, EvaluateDatasetError> {
    let dataset = ctx
        .registry
        .fetch_owned(query.dataset_id, query.owner_id)
        .await?;

    if !ctx.storage.synthetic_exists(dataset.id, &dataset.name) {
        return Err(EvaluateDatasetError::ArtifactNotFound(EvaluationError::ArtifactNotFound));
    }

    let storage = ctx.storage.clone();
    let engine = ctx.engine.clone();
    let real_path = PathBuf::from(&dataset.path);
    let (id, name) = (dataset.id, dataset.name.clone());

    let evaluation = ctx
        .run_blocking(move || -> Result<_, EvaluateDatasetError> {
            let real = storage.read_real(&real_path).map_err(|e| match e {
                StorageError::NotFound => EvaluateDatasetError::SourceMissing,
                other => other.into(),
            })?;
            let synthetic = storage.read_synthetic(id, &name).map_err(|e| match e {
                StorageError::NotFound => {
                    EvaluateDatasetError::ArtifactNotFound(EvaluationError::ArtifactNotFound)
                },
                other => other.into(),
            })?;
            let plot_root = storage.layout().plot_root.clone();
            Ok(engine.evaluate_with_plots(id, &real, &synthetic, &plot_root)?)
        })
        .await??;

    let plots = evaluation
        .plots
        .iter()
        .filter_map(|path| path.file_name())
        .map(|file| plot_url(id, &file.to_string_lossy()))
        .collect();

    tracing::info!(
        dataset_id = id,
        overall_score = evaluation.report.overall_score,
        "Dataset evaluated"
    );

    Ok(EvaluateDatasetResponse {
        dataset_id: id,
        report: evaluation.report,
        plots,
    })
}
