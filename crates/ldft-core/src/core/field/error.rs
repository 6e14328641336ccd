use crate::core::lattice::GeometryError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("A density field needs at least one species")]
    NoSpecies,

    #[error("Expected data for {expected} species, got {found}")]
    SpeciesCount { expected: usize, found: usize },

    #[error("Species index {index} is out of range for {count} species")]
    SpeciesOutOfRange { index: usize, count: usize },

    #[error("Invalid constraint for species {species}: {reason}")]
    InvalidConstraint { species: usize, reason: String },

    #[error("Invalid density {value} for species {species}: densities must lie in (0, 1)")]
    InvalidDensity { species: usize, value: f64 },

    #[error("Non-finite value in the profile of species {species}")]
    NonFiniteProfile { species: usize },

    #[error("Non-finite value in the external potential of species {species}")]
    NonFinitePotential { species: usize },

    #[error("The chemical potential of species {species} is not known yet")]
    MissingChemicalPotential { species: usize },

    #[error("Invalid nucleus for species {species}: {reason}")]
    InvalidNucleus { species: usize, reason: String },

    #[error(
        "History sequences must have equal length (fields: {fields}, indices: {indices}, errors: {errors})"
    )]
    HistoryLength {
        fields: usize,
        indices: usize,
        errors: usize,
    },

    #[error("History must contain at least one entry")]
    EmptyHistory,

    #[error("History indices must be strictly increasing: {found} follows {previous} at position {position}")]
    NonMonotonicHistory {
        position: usize,
        previous: usize,
        found: usize,
    },

    #[error("History entry {position} carries {found} errors, expected one per species ({expected})")]
    ErrorWidth {
        position: usize,
        expected: usize,
        found: usize,
    },

    #[error("No density profile has been assigned yet")]
    Uninitialized,
}
