//! Synthesis parameters
//!
//! [`SynthesisForm`] is the flat, loosely typed shape that arrives from a caller.
//! [`SynthesisRequest`] is what the selector accepts: every strategy only
//! carries the parameters it understands, and every bound has been checked.

use super::SynthesisError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    FastPreset,
    GaussianCopula,
    Ctgan,
    CopulaGan,
    Tvae,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::FastPreset,
        Strategy::GaussianCopula,
        Strategy::Ctgan,
        Strategy::CopulaGan,
        Strategy::Tvae,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::FastPreset => "fast-preset",
            Strategy::GaussianCopula => "gaussian-copula",
            Strategy::Ctgan => "ctgan",
            Strategy::CopulaGan => "copula-gan",
            Strategy::Tvae => "tvae",
        }
    }

    /// GAN and VAE strategies train for a number of epochs.
    pub fn requires_epochs(self) -> bool {
        matches!(self, Strategy::Ctgan | Strategy::CopulaGan | Strategy::Tvae)
    }

    /// Copula strategies accept marginal distribution choices.
    pub fn uses_distributions(self) -> bool {
        matches!(self, Strategy::GaussianCopula | Strategy::CopulaGan)
    }
}

impl FromStr for Strategy {
    type Err = SynthesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast_ml" | "fast-ml" | "fast-preset" | "fast_preset" => Ok(Strategy::FastPreset),
            "gaussian_copula" | "gaussian-copula" => Ok(Strategy::GaussianCopula),
            "ctgan" => Ok(Strategy::Ctgan),
            "copulagan" | "copula-gan" | "copula_gan" => Ok(Strategy::CopulaGan),
            "tvae" => Ok(Strategy::Tvae),
            other => Err(SynthesisError::UnknownStrategy(other.to_string())),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marginal distribution family for copula strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    Norm,
    #[default]
    Beta,
    Truncnorm,
    Uniform,
    Gamma,
    GaussianKde,
}

impl FromStr for Distribution {
    type Err = SynthesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "norm" | "normal" => Ok(Distribution::Norm),
            "beta" => Ok(Distribution::Beta),
            "truncnorm" => Ok(Distribution::Truncnorm),
            "uniform" => Ok(Distribution::Uniform),
            "gamma" => Ok(Distribution::Gamma),
            "gaussian_kde" => Ok(Distribution::GaussianKde),
            other => Err(SynthesisError::InvalidParameter(format!(
                "unknown distribution '{other}'"
            ))),
        }
    }
}

/// Flat parameter bag as submitted by a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisForm {
    pub strategy: String,
    pub rows: i64,
    #[serde(default)]
    pub epochs: Option<i64>,
    #[serde(default = "default_true")]
    pub enforce_min_max_values: bool,
    #[serde(default = "default_true")]
    pub enforce_rounding: bool,
    #[serde(default)]
    pub cuda: bool,
    #[serde(default)]
    pub default_distribution: Option<String>,
    /// Column name to distribution name; the value `none` means no override.
    #[serde(default)]
    pub column_distributions: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

/// Options shared by every non-preset strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub enforce_min_max: bool,
    pub enforce_rounding: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            enforce_min_max: true,
            enforce_rounding: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopulaParams {
    pub constraints: Constraints,
    pub default_distribution: Distribution,
    /// `None` when no column is overridden.
    pub column_distributions: Option<BTreeMap<String, Distribution>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub epochs: NonZeroUsize,
    pub use_accelerator: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeuralParams {
    pub constraints: Constraints,
    pub training: TrainingParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum StrategyConfig {
    FastPreset,
    GaussianCopula(CopulaParams),
    Ctgan(NeuralParams),
    CopulaGan {
        copula: CopulaParams,
        training: TrainingParams,
    },
    Tvae(NeuralParams),
}

impl StrategyConfig {
    pub fn strategy(&self) -> Strategy {
        match self {
            StrategyConfig::FastPreset => Strategy::FastPreset,
            StrategyConfig::GaussianCopula(_) => Strategy::GaussianCopula,
            StrategyConfig::Ctgan(_) => Strategy::Ctgan,
            StrategyConfig::CopulaGan { .. } => Strategy::CopulaGan,
            StrategyConfig::Tvae(_) => Strategy::Tvae,
        }
    }

    /// The fast preset always clamps and rounds.
    pub fn constraints(&self) -> Constraints {
        match self {
            StrategyConfig::FastPreset => Constraints::default(),
            StrategyConfig::GaussianCopula(p) => p.constraints,
            StrategyConfig::CopulaGan { copula, .. } => copula.constraints,
            StrategyConfig::Ctgan(p) | StrategyConfig::Tvae(p) => p.constraints,
        }
    }

    pub fn copula(&self) -> Option<&CopulaParams> {
        match self {
            StrategyConfig::GaussianCopula(p) => Some(p),
            StrategyConfig::CopulaGan { copula, .. } => Some(copula),
            _ => None,
        }
    }

    pub fn training(&self) -> Option<TrainingParams> {
        match self {
            StrategyConfig::CopulaGan { training, .. } => Some(*training),
            StrategyConfig::Ctgan(p) | StrategyConfig::Tvae(p) => Some(p.training),
            _ => None,
        }
    }
}

/// A validated synthesis job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub row_count: NonZeroUsize,
    pub config: StrategyConfig,
}

impl SynthesisRequest {
    pub fn new(row_count: NonZeroUsize, config: StrategyConfig) -> Self {
        Self { row_count, config }
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy()
    }
}

fn positive(value: i64, field: &str) -> Result<NonZeroUsize, SynthesisError> {
    usize::try_from(value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            SynthesisError::InvalidParameter(format!("{field} must be greater than 0"))
        })
}

impl SynthesisForm {
    fn copula_params(&self, constraints: Constraints) -> Result<CopulaParams, SynthesisError> {
        let default_distribution = self
            .default_distribution
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default();

        let mut overrides = BTreeMap::new();
        for (column, name) in &self.column_distributions {
            if name.trim().eq_ignore_ascii_case("none") {
                continue;
            }
            overrides.insert(column.clone(), name.parse()?);
        }

        Ok(CopulaParams {
            constraints,
            default_distribution,
            column_distributions: (!overrides.is_empty()).then_some(overrides),
        })
    }
}

impl TryFrom<SynthesisForm> for SynthesisRequest {
    type Error = SynthesisError;

    fn try_from(form: SynthesisForm) -> Result<Self, Self::Error> {
        let strategy: Strategy = form.strategy.parse()?;
        let row_count = positive(form.rows, "rows")?;

        let epochs = form.epochs.map(|e| positive(e, "epochs")).transpose()?;
        let training = if strategy.requires_epochs() {
            let epochs = epochs.ok_or_else(|| {
                SynthesisError::InvalidParameter(format!("epochs is required for {strategy}"))
            })?;
            Some(TrainingParams {
                epochs,
                use_accelerator: form.cuda,
            })
        } else {
            None
        };

        let constraints = Constraints {
            enforce_min_max: form.enforce_min_max_values,
            enforce_rounding: form.enforce_rounding,
        };

        let config = match (strategy, training) {
            (Strategy::FastPreset, _) => StrategyConfig::FastPreset,
            (Strategy::GaussianCopula, _) => {
                StrategyConfig::GaussianCopula(form.copula_params(constraints)?)
            },
            (Strategy::CopulaGan, Some(training)) => StrategyConfig::CopulaGan {
                copula: form.copula_params(constraints)?,
                training,
            },
            (Strategy::Ctgan, Some(training)) => StrategyConfig::Ctgan(NeuralParams {
                constraints,
                training,
            }),
            (Strategy::Tvae, Some(training)) => StrategyConfig::Tvae(NeuralParams {
                constraints,
                training,
            }),
            (strategy, None) => {
                return Err(SynthesisError::InvalidParameter(format!(
                    "epochs is required for {strategy}"
                )))
            },
        };

        Ok(SynthesisRequest { row_count, config })
    }
}
