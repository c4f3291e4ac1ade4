//! Quality scoring
//!
//! The default scorer reports two properties, each the mean of per-item scores
//! in [0, 1]:
//!
//! - **Column Shapes**: KS complement for numeric columns, total variation
//!   complement for everything else.
//! - **Column Pair Trends**: correlation similarity for numeric pairs,
//!   contingency similarity otherwise (numeric sides are binned).
//!
//! The overall score is the mean of the properties that could be computed.

use super::stats::{complete_pairs, correlation};
use crate::metadata::{ColumnType, TableMetadata};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use tabsynth_common::{is_missing, Table};

/// Bins used when a numeric column meets a categorical one.
const CONTINGENCY_BINS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeMetric {
    KsComplement,
    TvComplement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    CorrelationSimilarity,
    ContingencySimilarity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnShapeScore {
    pub column: String,
    pub metric: ShapeMetric,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTrendScore {
    pub columns: (String, String),
    pub metric: TrendMetric,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub column_shapes: Vec<ColumnShapeScore>,
    pub column_pair_trends: Vec<PairTrendScore>,
}

fn average(scores: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = scores.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

impl QualityScores {
    pub fn column_shapes_score(&self) -> Option<f64> {
        average(self.column_shapes.iter().map(|s| s.score))
    }

    pub fn column_pair_trends_score(&self) -> Option<f64> {
        average(self.column_pair_trends.iter().map(|s| s.score))
    }

    /// Mean of the available properties, clamped to [0, 1].
    pub fn overall(&self) -> f64 {
        let properties = [self.column_shapes_score(), self.column_pair_trends_score()];
        average(properties.into_iter().flatten())
            .unwrap_or(0.0)
            .clamp(0.0, 1.0)
    }
}

pub trait QualityScorer: Send + Sync {
    /// `real` and `synthetic` share the column list described by `metadata`.
    fn score(&self, real: &Table, synthetic: &Table, metadata: &TableMetadata) -> QualityScores;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StatisticalScorer;

fn present_numeric(table: &Table, index: usize) -> Vec<f64> {
    table.numeric_values(index).into_iter().flatten().collect()
}

/// Two-sample Kolmogorov-Smirnov statistic.
pub fn ks_statistic(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / na - j as f64 / nb).abs());
    }
    Some(d)
}

fn frequencies<K: Eq + Hash>(keys: impl Iterator<Item = K>) -> HashMap<K, f64> {
    let mut counts: HashMap<K, f64> = HashMap::new();
    let mut total = 0.0;
    for key in keys {
        *counts.entry(key).or_default() += 1.0;
        total += 1.0;
    }
    if total > 0.0 {
        counts.values_mut().for_each(|v| *v /= total);
    }
    counts
}

/// Total variation distance between two discrete distributions.
pub fn total_variation<K: Eq + Hash>(p: &HashMap<K, f64>, q: &HashMap<K, f64>) -> f64 {
    let mut sum: f64 = p
        .iter()
        .map(|(k, pv)| (pv - q.get(k).copied().unwrap_or(0.0)).abs())
        .sum();
    sum += q
        .iter()
        .filter(|(k, _)| !p.contains_key(*k))
        .map(|(_, qv)| qv.abs())
        .sum::<f64>();
    0.5 * sum
}

fn present_labels(table: &Table, index: usize) -> impl Iterator<Item = &str> + '_ {
    table.column_values(index).filter(|c| !is_missing(c)).map(str::trim)
}

/// Maps a cell to a discrete label; numeric cells are binned on the real range.
#[derive(Debug, Clone, Copy)]
enum Discretizer {
    Label,
    Bins { min: f64, width: f64 },
}

impl Discretizer {
    fn for_column(real: &Table, index: usize, column_type: ColumnType) -> Self {
        if !column_type.is_numeric() {
            return Discretizer::Label;
        }
        let values = present_numeric(real, index);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            return Discretizer::Label;
        }
        let width = (max - min) / CONTINGENCY_BINS as f64;
        Discretizer::Bins { min, width }
    }

    fn key(&self, cell: &str) -> Option<String> {
        if is_missing(cell) {
            return None;
        }
        match self {
            Discretizer::Label => Some(cell.trim().to_string()),
            Discretizer::Bins { min, width } => {
                let v = cell.trim().parse::<f64>().ok()?;
                let bin = if *width > 0.0 {
                    ((v - min) / width).floor().clamp(0.0, (CONTINGENCY_BINS - 1) as f64)
                } else {
                    0.0
                };
                Some(format!("bin{}", bin as usize))
            },
        }
    }
}

fn contingency(
    table: &Table,
    first: (usize, Discretizer),
    second: (usize, Discretizer),
) -> HashMap<(String, String), f64> {
    let keys = table.rows().iter().filter_map(|row| {
        let a = first.1.key(row.get(first.0)?)?;
        let b = second.1.key(row.get(second.0)?)?;
        Some((a, b))
    });
    frequencies(keys)
}

impl StatisticalScorer {
    fn column_shape(
        &self,
        real: &Table,
        synthetic: &Table,
        index: usize,
        column_type: ColumnType,
    ) -> Option<(ShapeMetric, f64)> {
        if column_type.is_numeric() {
            let d = ks_statistic(&present_numeric(real, index), &present_numeric(synthetic, index))?;
            Some((ShapeMetric::KsComplement, 1.0 - d))
        } else {
            let p = frequencies(present_labels(real, index));
            let q = frequencies(present_labels(synthetic, index));
            if p.is_empty() || q.is_empty() {
                return None;
            }
            Some((ShapeMetric::TvComplement, 1.0 - total_variation(&p, &q)))
        }
    }

    fn pair_trend(
        &self,
        real: &Table,
        synthetic: &Table,
        (i, ti): (usize, ColumnType),
        (j, tj): (usize, ColumnType),
    ) -> Option<(TrendMetric, f64)> {
        if ti.is_numeric() && tj.is_numeric() {
            let r_real = correlation(&complete_pairs(&real.numeric_values(i), &real.numeric_values(j)))?;
            let r_syn = correlation(&complete_pairs(
                &synthetic.numeric_values(i),
                &synthetic.numeric_values(j),
            ))?;
            return Some((
                TrendMetric::CorrelationSimilarity,
                1.0 - (r_real - r_syn).abs() / 2.0,
            ));
        }

        let first = (i, Discretizer::for_column(real, i, ti));
        let second = (j, Discretizer::for_column(real, j, tj));
        let p = contingency(real, first, second);
        let q = contingency(synthetic, first, second);
        if p.is_empty() || q.is_empty() {
            return None;
        }
        Some((
            TrendMetric::ContingencySimilarity,
            1.0 - total_variation(&p, &q),
        ))
    }
}

impl QualityScorer for StatisticalScorer {
    fn score(&self, real: &Table, synthetic: &Table, metadata: &TableMetadata) -> QualityScores {
        let column_shapes = metadata
            .columns
            .iter()
            .enumerate()
            .filter_map(|(idx, column)| {
                let (metric, score) = self.column_shape(real, synthetic, idx, column.column_type)?;
                Some(ColumnShapeScore {
                    column: column.name.clone(),
                    metric,
                    score,
                })
            })
            .collect();

        let mut column_pair_trends = Vec::new();
        for (i, first) in metadata.columns.iter().enumerate() {
            for (j, second) in metadata.columns.iter().enumerate().skip(i + 1) {
                if let Some((metric, score)) = self.pair_trend(
                    real,
                    synthetic,
                    (i, first.column_type),
                    (j, second.column_type),
                ) {
                    column_pair_trends.push(PairTrendScore {
                        columns: (first.name.clone(), second.name.clone()),
                        metric,
                        score,
                    });
                }
            }
        }

        QualityScores {
            column_shapes,
            column_pair_trends,
        }
    }
}
