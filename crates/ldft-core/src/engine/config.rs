use super::checkpoint::CheckpointMethod;
use ndarray::{ArrayD, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Norm used to measure the change between two successive Picard fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorNorm {
    /// Sum over all sites of the squared difference.
    #[default]
    SumOfSquares,
    /// Mean over all sites of the absolute difference.
    MeanAbsolute,
    /// Largest absolute difference at any site.
    MaxAbsolute,
}

impl ErrorNorm {
    pub fn measure(self, iterated: &ArrayD<f64>, previous: &ArrayD<f64>) -> f64 {
        let zip = Zip::from(iterated).and(previous);
        match self {
            Self::SumOfSquares => zip.fold(0.0, |acc, &a, &b| acc + (a - b) * (a - b)),
            Self::MeanAbsolute => {
                let total = zip.fold(0.0, |acc, &a, &b| acc + (a - b).abs());
                if iterated.is_empty() {
                    0.0
                } else {
                    total / iterated.len() as f64
                }
            }
            // NaN must survive the reduction.
            Self::MaxAbsolute => zip.fold(0.0, |acc: f64, &a, &b| {
                let d = (a - b).abs();
                if d.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(d) }
            }),
        }
    }
}

impl fmt::Display for ErrorNorm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SumOfSquares => "sum-of-squares",
            Self::MeanAbsolute => "mean-absolute",
            Self::MaxAbsolute => "max-absolute",
        })
    }
}

impl FromStr for ErrorNorm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum-of-squares" | "sse" | "l2" => Ok(Self::SumOfSquares),
            "mean-absolute" | "mae" => Ok(Self::MeanAbsolute),
            "max-absolute" | "max" | "linf" => Ok(Self::MaxAbsolute),
            other => Err(ConfigError::InvalidParameter {
                name: "error_norm",
                reason: format!("unknown norm '{other}'"),
            }),
        }
    }
}

/// Stops a run once the error grows too far above the best error seen in it.
///
/// Non-finite values always count as divergence, with or without a guard.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DivergenceGuard {
    /// Largest tolerated ratio between the current and the smallest error of
    /// the run, per species. `None` disables the check.
    pub max_error_growth: Option<f64>,
}

impl DivergenceGuard {
    pub fn with_max_growth(factor: f64) -> Self {
        Self {
            max_error_growth: Some(factor),
        }
    }
}

/// Parameters of one Picard run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Mixing parameter α in (0, 1].
    pub damping: f64,
    /// Number of Picard steps after which the run gives up.
    pub max_steps: usize,
    pub checkpoints: CheckpointMethod,
    /// Convergence threshold on every species error; `None` runs all steps.
    pub min_error: Option<f64>,
    pub error_norm: ErrorNorm,
    pub divergence: DivergenceGuard,
}

impl SolverConfig {
    pub fn builder() -> SolverConfigBuilder {
        SolverConfigBuilder::new()
    }

    /// Checks every parameter range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_damping(self.damping)?;
        if let Some(min_error) = self.min_error {
            if !(min_error.is_finite() && min_error > 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name: "min_error",
                    reason: format!("must be a positive finite number, got {min_error}"),
                });
            }
        }
        if let Some(factor) = self.divergence.max_error_growth {
            if !(factor.is_finite() && factor > 1.0) {
                return Err(ConfigError::InvalidParameter {
                    name: "max_error_growth",
                    reason: format!("must be a finite factor greater than 1, got {factor}"),
                });
            }
        }
        self.checkpoints
            .validate()
            .map_err(|reason| ConfigError::InvalidParameter {
                name: "checkpoints",
                reason,
            })
    }
}

pub(crate) fn validate_damping(damping: f64) -> Result<(), ConfigError> {
    if !(damping > 0.0 && damping <= 1.0) {
        return Err(ConfigError::InvalidParameter {
            name: "damping",
            reason: format!("must lie in (0, 1], got {damping}"),
        });
    }
    Ok(())
}

#[derive(Default)]
pub struct SolverConfigBuilder {
    damping: Option<f64>,
    max_steps: Option<usize>,
    checkpoints: Option<CheckpointMethod>,
    min_error: Option<f64>,
    error_norm: Option<ErrorNorm>,
    divergence: Option<DivergenceGuard>,
}

impl SolverConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn damping(mut self, alpha: f64) -> Self {
        self.damping = Some(alpha);
        self
    }
    pub fn max_steps(mut self, steps: usize) -> Self {
        self.max_steps = Some(steps);
        self
    }
    pub fn checkpoints(mut self, method: CheckpointMethod) -> Self {
        self.checkpoints = Some(method);
        self
    }
    pub fn min_error(mut self, threshold: f64) -> Self {
        self.min_error = Some(threshold);
        self
    }
    pub fn error_norm(mut self, norm: ErrorNorm) -> Self {
        self.error_norm = Some(norm);
        self
    }
    pub fn divergence(mut self, guard: DivergenceGuard) -> Self {
        self.divergence = Some(guard);
        self
    }

    pub fn build(self) -> Result<SolverConfig, ConfigError> {
        let config = SolverConfig {
            damping: self
                .damping
                .ok_or(ConfigError::MissingParameter("damping"))?,
            max_steps: self
                .max_steps
                .ok_or(ConfigError::MissingParameter("max_steps"))?,
            checkpoints: self
                .checkpoints
                .ok_or(ConfigError::MissingParameter("checkpoints"))?,
            min_error: self.min_error,
            error_norm: self.error_norm.unwrap_or_default(),
            divergence: self.divergence.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}
