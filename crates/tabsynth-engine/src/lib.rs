//! Tabsynth Engine
//!
//! Everything that operates on table contents, independent of how tables are
//! stored or requested:
//!
//! - [`validator`]: structural checks on untrusted uploads
//! - [`metadata`]: column type detection
//! - [`synthesis`]: strategy selection and the synthesizer seam
//! - [`evaluation`]: quality score, pair statistics and comparison plots
//!
//! [`Engine`] bundles the pluggable parts so callers can hold one handle.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod evaluation;
pub mod metadata;
pub mod synthesis;
pub mod validator;

use evaluation::{
    plots::{render_all, PlotContext},
    EvaluationError, PlotError, PlotRenderer, PngPlotRenderer, QualityReport, QualityScorer,
    StatisticalScorer,
};
use metadata::{HeuristicDetector, MetadataDetector, TableMetadata};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use synthesis::{EmpiricalBackend, SynthesisError, SynthesisRequest, SynthesizerBackend};
use tabsynth_common::Table;

#[derive(Clone)]
pub struct Engine {
    pub backend: Arc<dyn SynthesizerBackend>,
    pub detector: Arc<dyn MetadataDetector>,
    pub scorer: Arc<dyn QualityScorer>,
    pub renderer: Arc<dyn PlotRenderer>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_backend(EmpiricalBackend::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

/// Report plus the plot files written for it.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub report: QualityReport,
    pub metadata: TableMetadata,
    pub plots: Vec<PathBuf>,
}

impl Engine {
    pub fn with_backend(backend: impl SynthesizerBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            detector: Arc::new(HeuristicDetector),
            scorer: Arc::new(StatisticalScorer),
            renderer: Arc::new(PngPlotRenderer::default()),
        }
    }

    pub fn detect(&self, table: &Table) -> TableMetadata {
        self.detector.detect(table)
    }

    pub fn synthesize(&self, real: &Table, request: &SynthesisRequest) -> Result<Table, SynthesisError> {
        synthesis::synthesize(self.backend.as_ref(), self.detector.as_ref(), real, request)
    }

    pub fn evaluate(&self, real: &Table, synthetic: &Table) -> Result<(QualityReport, TableMetadata), EvaluationError> {
        evaluation::evaluate(real, synthetic, self.detector.as_ref(), self.scorer.as_ref())
    }

    /// Evaluate and render every planned plot for dataset `id` into `plot_root`.
    pub fn evaluate_with_plots(
        &self,
        id: i64,
        real: &Table,
        synthetic: &Table,
        plot_root: &Path,
    ) -> Result<Evaluation, EngineError> {
        let (report, metadata) = self.evaluate(real, synthetic)?;
        let specs = evaluation::plan_plots(id, &metadata, &report.column_pairs);
        let ctx = PlotContext {
            real,
            synthetic,
            metadata: &metadata,
            report: &report,
        };
        let plots = render_all(self.renderer.as_ref(), &specs, &ctx, plot_root)?;
        Ok(Evaluation {
            report,
            metadata,
            plots,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Plot(#[from] PlotError),
}
