use super::error::FieldError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Thermodynamic ensemble a species is treated in during Picard iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ensemble {
    /// Chemical potential fixed, average density derived.
    GrandCanonical,
    /// Average density fixed, chemical potential derived.
    Canonical,
}

impl fmt::Display for Ensemble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GrandCanonical => f.write_str("grand-canonical"),
            Self::Canonical => f.write_str("canonical"),
        }
    }
}

/// The authoritative thermodynamic constraint of one species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Constraint {
    /// Fixed chemical potential (in units of the thermal energy).
    ChemicalPotential(f64),
    /// Fixed average density per lattice site, in (0, 1).
    AverageDensity(f64),
}

impl Constraint {
    pub fn ensemble(&self) -> Ensemble {
        match self {
            Self::ChemicalPotential(_) => Ensemble::GrandCanonical,
            Self::AverageDensity(_) => Ensemble::Canonical,
        }
    }

    pub(crate) fn validate(&self, species: usize) -> Result<(), FieldError> {
        match *self {
            Self::ChemicalPotential(mu) if !mu.is_finite() => Err(FieldError::InvalidConstraint {
                species,
                reason: format!("chemical potential {mu} is not finite"),
            }),
            Self::AverageDensity(rho) if !(rho > 0.0 && rho < 1.0) => {
                Err(FieldError::InvalidDensity {
                    species,
                    value: rho,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Per-species bookkeeping of chemical potential and average density.
///
/// Exactly one of the two values is authoritative, selected by the ensemble.
/// The other one is derived by the solver and overwritten on every step; it
/// is `None` until the first step has been taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesState {
    ensemble: Ensemble,
    chemical_potential: Option<f64>,
    average_density: Option<f64>,
}

impl SpeciesState {
    pub fn from_constraint(constraint: Constraint) -> Self {
        match constraint {
            Constraint::ChemicalPotential(mu) => Self {
                ensemble: Ensemble::GrandCanonical,
                chemical_potential: Some(mu),
                average_density: None,
            },
            Constraint::AverageDensity(rho) => Self {
                ensemble: Ensemble::Canonical,
                chemical_potential: None,
                average_density: Some(rho),
            },
        }
    }

    pub fn ensemble(&self) -> Ensemble {
        self.ensemble
    }

    pub fn is_grand_canonical(&self) -> bool {
        self.ensemble == Ensemble::GrandCanonical
    }

    pub fn chemical_potential(&self) -> Option<f64> {
        self.chemical_potential
    }

    pub fn average_density(&self) -> Option<f64> {
        self.average_density
    }

    /// The authoritative constraint, reconstructed from the bookkeeping.
    pub fn constraint(&self) -> Option<Constraint> {
        match self.ensemble {
            Ensemble::GrandCanonical => self.chemical_potential.map(Constraint::ChemicalPotential),
            Ensemble::Canonical => self.average_density.map(Constraint::AverageDensity),
        }
    }

    /// Overwrites the derived (non-authoritative) value.
    pub(crate) fn record_derived(&mut self, value: f64) {
        match self.ensemble {
            Ensemble::GrandCanonical => self.average_density = Some(value),
            Ensemble::Canonical => self.chemical_potential = Some(value),
        }
    }
}
