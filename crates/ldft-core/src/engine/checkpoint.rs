use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CheckpointParseError {
    #[error("Empty checkpoint method")]
    Empty,
    #[error("Invalid checkpoint method '{0}': expected 'N', 'expF' or 'decK'")]
    Format(String),
    #[error("Invalid parameter in checkpoint method '{input}': {reason}")]
    Parameter { input: String, reason: String },
}

/// Strategy that decides at which iteration counts the solver snapshots the
/// density field into the history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CheckpointMethod {
    /// Every `k` iterations.
    Constant(usize),
    /// At `ceil(current^f)`, growing the spacing geometrically.
    Exponential(f64),
    /// `k` evenly spaced checkpoints per decade, then the next power of ten.
    Decade(usize),
}

impl Default for CheckpointMethod {
    fn default() -> Self {
        Self::Decade(1)
    }
}

impl CheckpointMethod {
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Self::Constant(0) => Err("constant spacing must be positive".to_string()),
            Self::Decade(0) => Err("decade multiplier must be positive".to_string()),
            Self::Exponential(f) if !(f.is_finite() && f > 1.0) => {
                Err(format!("exponent must be a finite number greater than 1, got {f}"))
            }
            _ => Ok(()),
        }
    }
}

/// Returns the iteration count of the checkpoint following `current`.
///
/// The result is always strictly greater than `current`, so repeatedly
/// applying it yields a strictly increasing schedule. Methods must be valid
/// (see [`CheckpointMethod::validate`]); degenerate parameters fall back to
/// `current + 1`.
pub fn next_checkpoint(current: usize, method: CheckpointMethod) -> usize {
    let next = match method {
        CheckpointMethod::Constant(k) => {
            let k = k.max(1);
            (current / k + 1) * k
        }
        CheckpointMethod::Exponential(f) => {
            let candidate = (current as f64).powf(f).ceil();
            if candidate.is_finite() && candidate < usize::MAX as f64 {
                candidate as usize
            } else {
                usize::MAX
            }
        }
        CheckpointMethod::Decade(k) => {
            let k = k.max(1);
            let exponent = decade_exponent(current);
            let decade = 10usize.saturating_pow(exponent);
            let upper = decade.saturating_mul(10);
            let step = decade.saturating_mul(k);
            let candidate = (current / step + 1).saturating_mul(step);
            candidate.min(upper)
        }
    };
    next.max(current.saturating_add(1))
}

/// `max(1, floor(log10(current)))`, computed on integers.
fn decade_exponent(current: usize) -> u32 {
    let mut exponent = 0;
    let mut rest = current;
    while rest >= 10 {
        rest /= 10;
        exponent += 1;
    }
    exponent.max(1)
}

/// Iterator over the checkpoint schedule starting after `start`.
pub fn schedule(start: usize, method: CheckpointMethod) -> impl Iterator<Item = usize> {
    std::iter::successors(Some(next_checkpoint(start, method)), move |&c| {
        (c < usize::MAX).then(|| next_checkpoint(c, method))
    })
}

impl fmt::Display for CheckpointMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(k) => write!(f, "{k}"),
            Self::Exponential(x) => write!(f, "exp{x}"),
            Self::Decade(k) => write!(f, "dec{k}"),
        }
    }
}

impl FromStr for CheckpointMethod {
    type Err = CheckpointParseError;

    /// Parses `"25"`, `"exp1.5"`, `"exp:1.5"`, `"dec3"` or `"dec:3"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(CheckpointParseError::Empty);
        }
        let lower = input.to_ascii_lowercase();
        let parameter = |rest: &str| rest.strip_prefix(':').unwrap_or(rest).trim().to_string();
        let invalid = |reason: String| CheckpointParseError::Parameter {
            input: input.to_string(),
            reason,
        };

        let method = if let Some(rest) = lower.strip_prefix("exp") {
            let value = parameter(rest)
                .parse::<f64>()
                .map_err(|e| invalid(e.to_string()))?;
            Self::Exponential(value)
        } else if let Some(rest) = lower.strip_prefix("dec") {
            let value = parameter(rest)
                .parse::<usize>()
                .map_err(|e| invalid(e.to_string()))?;
            Self::Decade(value)
        } else if lower.chars().all(|c| c.is_ascii_digit()) {
            let value = lower.parse::<usize>().map_err(|e| invalid(e.to_string()))?;
            Self::Constant(value)
        } else {
            return Err(CheckpointParseError::Format(input.to_string()));
        };
        method.validate().map_err(invalid)?;
        Ok(method)
    }
}

impl TryFrom<String> for CheckpointMethod {
    type Error = CheckpointParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CheckpointMethod> for String {
    fn from(method: CheckpointMethod) -> Self {
        method.to_string()
    }
}
