//! Statistical comparison of a real table and its synthetic replica

pub mod plots;
pub mod quality;
pub mod stats;

pub use plots::{plan_plots, PlotError, PlotKind, PlotRenderer, PlotSpec, PngPlotRenderer};
pub use quality::{QualityScorer, QualityScores, StatisticalScorer};
pub use stats::{PairStatistics, RegressionLine};

use crate::metadata::{MetadataDetector, TableMetadata};
use serde::{Deserialize, Serialize};
use tabsynth_common::Table;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("No synthetic table exists for this dataset")]
    ArtifactNotFound,

    #[error("Synthetic table columns {synthetic:?} do not match real columns {real:?}")]
    SchemaMismatch {
        real: Vec<String>,
        synthetic: Vec<String>,
    },
}

/// Ordered pair of numeric column names.
pub type ColumnPair = (String, String);

/// All `(i, j)` with `i < j` where both columns are numeric, in column order.
pub fn column_pairs(metadata: &TableMetadata) -> Vec<ColumnPair> {
    let numeric: Vec<&str> = metadata
        .columns
        .iter()
        .filter(|c| c.column_type.is_numeric())
        .map(|c| c.name.as_str())
        .collect();

    let mut pairs = Vec::new();
    for (i, first) in numeric.iter().enumerate() {
        for second in &numeric[i + 1..] {
            pairs.push((first.to_string(), second.to_string()));
        }
    }
    pairs
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyScores {
    pub column_shapes: Option<f64>,
    pub column_pair_trends: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairComparison {
    pub columns: ColumnPair,
    pub real: PairStatistics,
    pub synthetic: PairStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub overall_score: f64,
    pub properties: PropertyScores,
    pub details: QualityScores,
    pub column_pairs: Vec<ColumnPair>,
    pub pair_statistics: Vec<PairComparison>,
}

/// Compare `synthetic` against `real`; types come from the real table.
#[tracing::instrument(skip_all, fields(columns = real.width(), real_rows = real.len(), synthetic_rows = synthetic.len()))]
pub fn evaluate(
    real: &Table,
    synthetic: &Table,
    detector: &dyn MetadataDetector,
    scorer: &dyn QualityScorer,
) -> Result<(QualityReport, TableMetadata), EvaluationError> {
    if real.columns() != synthetic.columns() {
        return Err(EvaluationError::SchemaMismatch {
            real: real.columns().to_vec(),
            synthetic: synthetic.columns().to_vec(),
        });
    }

    let metadata = detector.detect(real);
    let details = scorer.score(real, synthetic, &metadata);
    let pairs = column_pairs(&metadata);

    let mut pair_statistics = Vec::with_capacity(pairs.len());
    for (first, second) in &pairs {
        // Both names come from the real header, which the synthetic header equals
        let (Some(i), Some(j)) = (real.column_index(first), real.column_index(second)) else {
            continue;
        };
        pair_statistics.push(PairComparison {
            columns: (first.clone(), second.clone()),
            real: PairStatistics::compute(&real.numeric_values(i), &real.numeric_values(j)),
            synthetic: PairStatistics::compute(
                &synthetic.numeric_values(i),
                &synthetic.numeric_values(j),
            ),
        });
    }

    let report = QualityReport {
        overall_score: details.overall(),
        properties: PropertyScores {
            column_shapes: details.column_shapes_score(),
            column_pair_trends: details.column_pair_trends_score(),
        },
        details,
        column_pairs: pairs,
        pair_statistics,
    };

    info!(score = report.overall_score, pairs = report.column_pairs.len(), "Quality report computed");
    Ok((report, metadata))
}
