use super::error::EngineError;
use std::fmt;
use thiserror::Error;

/// The quantity that turned non-finite during a Picard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergentQuantity {
    ExcessChemicalPotential,
    Density,
    ChemicalPotential,
    AverageDensity,
    Error,
}

impl fmt::Display for DivergentQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExcessChemicalPotential => "excess chemical potential",
            Self::Density => "density",
            Self::ChemicalPotential => "chemical potential",
            Self::AverageDensity => "average density",
            Self::Error => "error",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DivergenceError {
    #[error("Non-finite {quantity} for species {species} in step {iteration}")]
    NonFinite {
        species: usize,
        iteration: usize,
        quantity: DivergentQuantity,
    },

    #[error("Density {value} of species {species} left the domain of the functional in step {iteration}")]
    OutOfDomain {
        species: usize,
        iteration: usize,
        value: f64,
    },

    #[error(
        "Error of species {species} grew to {error:e} in step {iteration}, more than {limit}x its best value {best:e}"
    )]
    ErrorGrowth {
        species: usize,
        iteration: usize,
        error: f64,
        best: f64,
        limit: f64,
    },
}

/// Terminal state of a Picard run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every species error fell below the threshold.
    Converged,
    /// A step produced unusable values; the field holds the last good state.
    Diverged(DivergenceError),
    /// The step budget ran out first.
    Exhausted,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converged => f.write_str("converged"),
            Self::Diverged(_) => f.write_str("diverged"),
            Self::Exhausted => f.write_str("exhausted"),
        }
    }
}

/// Summary of a finished Picard run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Steps completed in this run.
    pub steps: usize,
    /// Iteration counter of the field when the run stopped.
    pub iteration: usize,
    /// Per-species errors of the last completed step; empty if none was.
    pub errors: Vec<f64>,
    /// Checkpoints appended to the history by this run.
    pub checkpoints: usize,
}

impl RunReport {
    pub fn is_converged(&self) -> bool {
        self.outcome == RunOutcome::Converged
    }

    pub fn max_error(&self) -> Option<f64> {
        self.errors.iter().copied().reduce(f64::max)
    }

    /// Converts a non-converged outcome into the matching [`EngineError`].
    pub fn into_result(self) -> Result<Self, EngineError> {
        match self.outcome {
            RunOutcome::Converged => Ok(self),
            RunOutcome::Diverged(error) => Err(EngineError::NumericalDivergence(error)),
            RunOutcome::Exhausted => Err(EngineError::ConvergenceNotReached {
                steps: self.steps,
                iteration: self.iteration,
                errors: self.errors,
            }),
        }
    }
}
