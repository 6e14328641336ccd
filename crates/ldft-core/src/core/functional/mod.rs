//! The free-energy functional contract and the reference lattice models.
//!
//! A [`Functional`] supplies the excess chemical potential that drives the
//! Picard update and the free energy used for diagnostics. How occupation
//! responds to a local exponent is described by its [`IdealTerm`].

pub mod ideal;
pub mod mean_field;

pub use ideal::IdealLatticeGas;
pub use mean_field::{BulkLatticeGas, MeanFieldLatticeGas};

use crate::core::field::{DensityField, FieldError};
use crate::core::lattice::GeometryError;
use ndarray::{ArrayD, Zip};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BISECTION_MAX_ITERATIONS: usize = 200;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FunctionalError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Functional '{name}' supports {supported} species, the field has {found}")]
    SpeciesCount {
        name: &'static str,
        supported: usize,
        found: usize,
    },

    #[error("Density {value} of species {species} is outside the domain of the functional")]
    DensityOutOfRange { species: usize, value: f64 },

    #[error("Cannot normalize species {species} to average density {target}: {reason}")]
    Normalization {
        species: usize,
        target: f64,
        reason: String,
    },
}

/// The ideal occupancy response `f` of a lattice site and its inverse `g`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdealTerm {
    /// `f(x) = exp(x)`, `g(ρ) = ln ρ`; ideal free energy `ρ (ln ρ - 1)`.
    #[default]
    Boltzmann,
    /// `f(x) = 1 / (1 + exp(-x))`, `g(ρ) = ln(ρ / (1 - ρ))`; single occupancy
    /// is built into the ideal part.
    Logistic,
}

impl IdealTerm {
    /// Occupation of a site with local exponent `x`.
    #[inline]
    pub fn occupation(self, x: f64) -> f64 {
        match self {
            Self::Boltzmann => x.exp(),
            Self::Logistic => {
                if x >= 0.0 {
                    1.0 / (1.0 + (-x).exp())
                } else {
                    let e = x.exp();
                    e / (1.0 + e)
                }
            }
        }
    }

    /// Exponent that produces occupation `rho`.
    #[inline]
    pub fn exponent(self, rho: f64) -> f64 {
        match self {
            Self::Boltzmann => rho.ln(),
            Self::Logistic => (rho / (1.0 - rho)).ln(),
        }
    }

    /// Ideal free-energy density of a site with occupation `rho`.
    #[inline]
    pub fn free_energy_density(self, rho: f64) -> f64 {
        match self {
            Self::Boltzmann => xlnx(rho) - rho,
            Self::Logistic => xlnx(rho) + xlnx(1.0 - rho),
        }
    }

    /// Returns the profile `f(μ + exponent)` whose spatial mean is `target`,
    /// together with the chemical potential `μ`.
    ///
    /// The Boltzmann case is solved in closed form; the logistic case by
    /// bisection on `μ`, followed by an exact rescale to the target mean.
    ///
    /// # Errors
    ///
    /// Returns [`FunctionalError::Normalization`] for an empty or non-finite
    /// exponent, or a target outside (0, 1).
    pub fn normalize(
        self,
        species: usize,
        exponent: &ArrayD<f64>,
        target: f64,
    ) -> Result<(ArrayD<f64>, f64), FunctionalError> {
        let fail = |reason: &str| FunctionalError::Normalization {
            species,
            target,
            reason: reason.to_string(),
        };
        if !(target > 0.0 && target < 1.0) {
            return Err(fail("the target must lie in (0, 1)"));
        }
        if exponent.is_empty() {
            return Err(fail("the lattice is empty"));
        }
        let (lo, hi) = exponent
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
        if !(lo.is_finite() && hi.is_finite()) {
            return Err(fail("the exponent is not finite"));
        }

        match self {
            Self::Boltzmann => {
                let mut weights = exponent.mapv(|x| (x - hi).exp());
                let mean = weights.mean().unwrap_or(0.0);
                let z = target / mean;
                weights *= z;
                Ok((weights, z.ln() - hi))
            }
            Self::Logistic => {
                let g = self.exponent(target);
                let mean_at = |mu: f64| {
                    exponent
                        .iter()
                        .map(|&x| self.occupation(mu + x))
                        .sum::<f64>()
                        / exponent.len() as f64
                };
                let mu = bisect(|mu| mean_at(mu) - target, g - hi, g - lo);
                let mut profile = exponent.mapv(|x| self.occupation(mu + x));
                let mean = profile.mean().unwrap_or(target);
                if mean > 0.0 {
                    profile *= target / mean;
                }
                Ok((profile, mu))
            }
        }
    }
}

/// A lattice free-energy functional driving the Picard iteration.
///
/// Implementations must be pure and deterministic. They are only required to
/// accept densities in (0, 1) and may fail with [`FunctionalError`] outside.
pub trait Functional: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Excess chemical potential of every species at every site.
    fn excess_chemical_potential(
        &self,
        field: &DensityField,
    ) -> Result<Vec<ArrayD<f64>>, FunctionalError>;

    /// Total Helmholtz free energy of the current profile, ideal part included.
    fn free_energy(&self, field: &DensityField) -> Result<f64, FunctionalError>;

    fn ideal_term(&self) -> IdealTerm {
        IdealTerm::Boltzmann
    }

    /// Canonical normalization of one species.
    ///
    /// Given the local exponent `-v_ext - μ_ex`, returns the iterated profile
    /// with spatial mean exactly `target` and the chemical potential that
    /// produces it.
    fn normalize_to_density(
        &self,
        species: usize,
        exponent: &ArrayD<f64>,
        target: f64,
    ) -> Result<(ArrayD<f64>, f64), FunctionalError> {
        self.ideal_term().normalize(species, exponent, target)
    }
}

/// Checks that a field has `supported` species (if restricted) and returns
/// its densities after verifying they lie in `[0, upper)`.
pub(crate) fn checked_densities<'a>(
    name: &'static str,
    field: &'a DensityField,
    supported: Option<usize>,
    upper: f64,
) -> Result<&'a [ArrayD<f64>], FunctionalError> {
    let densities = field.require_densities()?;
    if let Some(supported) = supported {
        if densities.len() != supported {
            return Err(FunctionalError::SpeciesCount {
                name,
                supported,
                found: densities.len(),
            });
        }
    }
    for (species, r) in densities.iter().enumerate() {
        if let Some(&value) = r.iter().find(|&&x| !(x >= 0.0 && x < upper)) {
            return Err(FunctionalError::DensityOutOfRange { species, value });
        }
    }
    Ok(densities)
}

/// Sum of `ρ · v` over all sites.
pub(crate) fn weighted_sum(rho: &ArrayD<f64>, v: &ArrayD<f64>) -> f64 {
    Zip::from(rho).and(v).fold(0.0, |acc, &r, &x| acc + r * x)
}

#[inline]
pub(crate) fn xlnx(x: f64) -> f64 {
    if x == 0.0 { 0.0 } else { x * x.ln() }
}

/// Bisection for a root of an increasing function `f` bracketed by `[lo, hi]`.
pub(crate) fn bisect<F: Fn(f64) -> f64>(f: F, mut lo: f64, mut hi: f64) -> f64 {
    for _ in 0..BISECTION_MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        if f(mid) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}
