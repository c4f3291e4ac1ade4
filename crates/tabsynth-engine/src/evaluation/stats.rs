//! Descriptive statistics over paired numeric columns
//!
//! All functions work on pairwise-complete observations: a row contributes only
//! when both cells are present. Undefined results (fewer than two observations,
//! zero variance) are `None` rather than NaN.

use serde::{Deserialize, Serialize};

/// Ordinary least squares fit of `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionLine {
    pub slope: f64,
    pub intercept: f64,
}

impl RegressionLine {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Covariance, correlation and regression of one column pair in one table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairStatistics {
    pub covariance: Option<f64>,
    pub correlation: Option<f64>,
    pub regression: Option<RegressionLine>,
}

pub fn complete_pairs(x: &[Option<f64>], y: &[Option<f64>]) -> Vec<(f64, f64)> {
    x.iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Unbiased sample variance.
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

struct Moments {
    mean_x: f64,
    mean_y: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
    n: usize,
}

fn moments(pairs: &[(f64, f64)]) -> Option<Moments> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    Some(Moments {
        mean_x,
        mean_y,
        sxx,
        syy,
        sxy,
        n: pairs.len(),
    })
}

/// Unbiased sample covariance.
pub fn covariance(pairs: &[(f64, f64)]) -> Option<f64> {
    let m = moments(pairs)?;
    Some(m.sxy / (m.n - 1) as f64)
}

/// Pearson correlation; `None` when either side is constant.
pub fn correlation(pairs: &[(f64, f64)]) -> Option<f64> {
    let m = moments(pairs)?;
    if m.sxx == 0.0 || m.syy == 0.0 {
        return None;
    }
    Some((m.sxy / (m.sxx.sqrt() * m.syy.sqrt())).clamp(-1.0, 1.0))
}

/// Least squares line of y on x; `None` when x is constant.
pub fn regression(pairs: &[(f64, f64)]) -> Option<RegressionLine> {
    let m = moments(pairs)?;
    if m.sxx == 0.0 {
        return None;
    }
    let slope = m.sxy / m.sxx;
    Some(RegressionLine {
        slope,
        intercept: m.mean_y - slope * m.mean_x,
    })
}

impl PairStatistics {
    pub fn compute(x: &[Option<f64>], y: &[Option<f64>]) -> Self {
        let pairs = complete_pairs(x, y);
        Self {
            covariance: covariance(&pairs),
            correlation: correlation(&pairs),
            regression: regression(&pairs),
        }
    }
}
