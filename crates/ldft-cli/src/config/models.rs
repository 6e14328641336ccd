use crate::cli::ModelArg;
use crate::error::{CliError, Result};
use ldft::core::field::Constraint;
use ldft::core::functional::{Functional, IdealLatticeGas, MeanFieldLatticeGas};
use ldft::core::lattice::LatticeGeometry;
use ldft::workflows::relax::RelaxConfig;
use std::fmt;

/// The free-energy model a run is carried out with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelKind {
    Ideal,
    IdealExclusion,
    MeanField { epsilon: f64 },
}

impl ModelKind {
    /// Combines a model name with its optional attraction strength.
    pub fn resolve(kind: ModelArg, epsilon: Option<f64>) -> Result<Self> {
        match (kind, epsilon) {
            (ModelArg::MeanField, Some(epsilon)) if epsilon.is_finite() => {
                Ok(Self::MeanField { epsilon })
            }
            (ModelArg::MeanField, Some(epsilon)) => Err(CliError::Config(format!(
                "`model.epsilon` must be finite, got {epsilon}."
            ))),
            (ModelArg::MeanField, None) => Err(CliError::Config(
                "The mean-field model requires `model.epsilon`.".to_string(),
            )),
            (_, Some(_)) => Err(CliError::Config(
                "`model.epsilon` only applies to the mean-field model.".to_string(),
            )),
            (ModelArg::Ideal, None) => Ok(Self::Ideal),
            (ModelArg::IdealExclusion, None) => Ok(Self::IdealExclusion),
        }
    }

    pub fn build(self) -> Box<dyn Functional> {
        match self {
            Self::Ideal => Box::new(IdealLatticeGas::new()),
            Self::IdealExclusion => Box::new(IdealLatticeGas::with_exclusion()),
            Self::MeanField { epsilon } => Box::new(MeanFieldLatticeGas::new(epsilon)),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ideal => write!(f, "ideal"),
            Self::IdealExclusion => write!(f, "ideal-exclusion"),
            Self::MeanField { epsilon } => write!(f, "mean-field (epsilon = {epsilon})"),
        }
    }
}

/// A fully resolved `run` invocation.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub geometry: LatticeGeometry,
    pub constraints: Vec<Constraint>,
    pub model: ModelKind,
    pub relax: RelaxConfig,
}
