//! Synthesis strategy selection
//!
//! A [`SynthesizerBackend`] turns a validated [`StrategyConfig`] into a fitted
//! [`Synthesizer`]. [`synthesize`] drives one end to end and checks that what
//! comes back has the shape that was asked for.

mod request;
pub mod sampler;

pub use request::{
    Constraints, CopulaParams, Distribution, NeuralParams, Strategy, StrategyConfig,
    SynthesisForm, SynthesisRequest, TrainingParams,
};
pub use sampler::EmpiricalBackend;

use crate::metadata::{MetadataDetector, TableMetadata};
use tabsynth_common::Table;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Distribution override names unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Source table has no rows to learn from")]
    EmptySource,

    #[error("Strategy {strategy} failed: {message}")]
    Strategy { strategy: Strategy, message: String },

    #[error("Synthetic table shape mismatch: {0}")]
    ShapeMismatch(String),
}

impl SynthesisError {
    /// Errors caused by caller input rather than by the strategy itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SynthesisError::InvalidParameter(_)
                | SynthesisError::UnknownStrategy(_)
                | SynthesisError::UnknownColumn(_)
                | SynthesisError::EmptySource
        )
    }
}

/// `fit(table)` then `sample(n)`.
pub trait Synthesizer: Send {
    fn fit(&mut self, real: &Table) -> Result<(), SynthesisError>;

    fn sample(&mut self, rows: usize) -> Result<Table, SynthesisError>;
}

pub trait SynthesizerBackend: Send + Sync {
    fn build(
        &self,
        metadata: &TableMetadata,
        config: &StrategyConfig,
    ) -> Result<Box<dyn Synthesizer>, SynthesisError>;
}

/// Generate a synthetic replica of `real` with `request.row_count` rows.
#[tracing::instrument(
    skip(backend, detector, real),
    fields(strategy = %request.strategy(), rows = request.row_count.get())
)]
pub fn synthesize(
    backend: &dyn SynthesizerBackend,
    detector: &dyn MetadataDetector,
    real: &Table,
    request: &SynthesisRequest,
) -> Result<Table, SynthesisError> {
    if real.is_empty() {
        return Err(SynthesisError::EmptySource);
    }

    let metadata = detector.detect(real);
    debug!(columns = metadata.columns.len(), "Detected table metadata");

    if let Some(overrides) = request
        .config
        .copula()
        .and_then(|c| c.column_distributions.as_ref())
    {
        if let Some(unknown) = overrides.keys().find(|name| metadata.column(name).is_none()) {
            return Err(SynthesisError::UnknownColumn(unknown.clone()));
        }
    }

    let mut synthesizer = backend.build(&metadata, &request.config)?;
    synthesizer.fit(real)?;
    let synthetic = synthesizer.sample(request.row_count.get())?;

    if synthetic.columns() != real.columns() {
        return Err(SynthesisError::ShapeMismatch(format!(
            "expected columns {:?}, got {:?}",
            real.columns(),
            synthetic.columns()
        )));
    }
    if synthetic.len() != request.row_count.get() {
        return Err(SynthesisError::ShapeMismatch(format!(
            "expected {} rows, got {}",
            request.row_count,
            synthetic.len()
        )));
    }

    info!(rows = synthetic.len(), "Synthetic table generated");
    Ok(synthetic)
}
