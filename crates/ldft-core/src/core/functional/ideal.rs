use super::{Functional, FunctionalError, IdealTerm, checked_densities};
use crate::core::field::DensityField;
use ndarray::ArrayD;

/// Non-interacting lattice gas with any number of species.
///
/// The excess chemical potential vanishes, so a grand-canonical species
/// relaxes to `f(μ - v_ext)` in a single undamped step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IdealLatticeGas {
    ideal: IdealTerm,
}

impl IdealLatticeGas {
    pub fn new() -> Self {
        Self::default()
    }

    /// An ideal gas whose sites hold at most one particle of each species.
    pub fn with_exclusion() -> Self {
        Self {
            ideal: IdealTerm::Logistic,
        }
    }
}

impl Functional for IdealLatticeGas {
    fn name(&self) -> &'static str {
        match self.ideal {
            IdealTerm::Boltzmann => "ideal",
            IdealTerm::Logistic => "ideal-exclusion",
        }
    }

    fn excess_chemical_potential(
        &self,
        field: &DensityField,
    ) -> Result<Vec<ArrayD<f64>>, FunctionalError> {
        let densities = field.require_densities()?;
        Ok(densities.iter().map(|r| ArrayD::zeros(r.raw_dim())).collect())
    }

    fn free_energy(&self, field: &DensityField) -> Result<f64, FunctionalError> {
        let upper = match self.ideal {
            IdealTerm::Boltzmann => f64::INFINITY,
            IdealTerm::Logistic => 1.0,
        };
        let densities = checked_densities(self.name(), field, None, upper)?;
        Ok(densities
            .iter()
            .flat_map(|r| r.iter())
            .map(|&rho| self.ideal.free_energy_density(rho))
            .sum())
    }

    fn ideal_term(&self) -> IdealTerm {
        self.ideal
    }
}
