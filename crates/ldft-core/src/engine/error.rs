use thiserror::Error;

use super::config::ConfigError;
use super::state::DivergenceError;
use crate::core::field::FieldError;
use crate::core::functional::FunctionalError;
use crate::core::io::PersistenceError;
use crate::core::lattice::GeometryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid solver configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid lattice: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Invalid density field: {0}")]
    Field(#[from] FieldError),

    #[error("Functional evaluation failed: {0}")]
    Functional(#[from] FunctionalError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Numerical divergence: {0}")]
    NumericalDivergence(#[from] DivergenceError),

    #[error("No convergence after {steps} steps (iteration {iteration}, errors {errors:?})")]
    ConvergenceNotReached {
        steps: usize,
        iteration: usize,
        errors: Vec<f64>,
    },
}
