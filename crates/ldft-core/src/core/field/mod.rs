//! Multi-species density state, its checkpoint history and initial profiles.

pub mod density;
pub mod error;
pub mod history;
pub mod profile;
pub mod species;

pub use density::DensityField;
pub use error::FieldError;
pub use history::{Checkpoint, History};
pub use profile::{DEFAULT_NUCLEUS_CONTRAST, Nucleus, homogeneous_profile, nucleated_profile};
pub use species::{Constraint, Ensemble, SpeciesState};
