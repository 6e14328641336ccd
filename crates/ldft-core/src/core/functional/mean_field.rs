use super::{Functional, FunctionalError, bisect, checked_densities, weighted_sum, xlnx};
use crate::core::field::DensityField;
use ndarray::{ArrayD, Zip};

/// Single-species lattice gas with hard-site exclusion and a mean-field
/// nearest-neighbour attraction of strength `epsilon` (in units of kT).
///
/// Neighbours are taken through the lattice's boundary topology, so the
/// model runs on periodic and tilted square / simple-cubic lattices alike.
///
/// ```text
/// F    = Σ [ρ(ln ρ - 1) + ρ + (1 - ρ) ln(1 - ρ)] - ε/2 Σ ρ Σ_nn ρ
/// μ_ex = -ln(1 - ρ) - ε Σ_nn ρ
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanFieldLatticeGas {
    epsilon: f64,
}

impl MeanFieldLatticeGas {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// The homogeneous bulk of this model on a `dim`-dimensional lattice.
    pub fn bulk(&self, dim: usize) -> BulkLatticeGas {
        BulkLatticeGas::new(self.epsilon, 2 * dim)
    }
}

impl Functional for MeanFieldLatticeGas {
    fn name(&self) -> &'static str {
        "mean-field"
    }

    fn excess_chemical_potential(
        &self,
        field: &DensityField,
    ) -> Result<Vec<ArrayD<f64>>, FunctionalError> {
        let densities = checked_densities(self.name(), field, Some(1), 1.0)?;
        let rho = &densities[0];
        let mut mu_ex = field.geometry().nearest_neighbour_sum(rho)?;
        let epsilon = self.epsilon;
        Zip::from(&mut mu_ex)
            .and(rho)
            .for_each(|nn, &r| *nn = -(1.0 - r).ln() - epsilon * *nn);
        Ok(vec![mu_ex])
    }

    fn free_energy(&self, field: &DensityField) -> Result<f64, FunctionalError> {
        let densities = checked_densities(self.name(), field, Some(1), 1.0)?;
        let rho = &densities[0];
        let local: f64 = rho
            .iter()
            .map(|&r| xlnx(r) + xlnx(1.0 - r))
            .sum();
        let nn = field.geometry().nearest_neighbour_sum(rho)?;
        Ok(local - 0.5 * self.epsilon * weighted_sum(rho, &nn))
    }
}

/// Thermodynamics of the homogeneous mean-field lattice gas.
///
/// `coordination` is the number of nearest neighbours of a site (4 on the
/// square lattice, 6 on the simple-cubic one).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulkLatticeGas {
    pub epsilon: f64,
    pub coordination: usize,
}

impl BulkLatticeGas {
    pub fn new(epsilon: f64, coordination: usize) -> Self {
        Self {
            epsilon,
            coordination,
        }
    }

    fn z_epsilon(&self) -> f64 {
        self.coordination as f64 * self.epsilon
    }

    /// Free-energy density per site.
    pub fn free_energy_density(&self, rho: f64) -> f64 {
        xlnx(rho) + xlnx(1.0 - rho) - 0.5 * self.z_epsilon() * rho * rho
    }

    pub fn chemical_potential(&self, rho: f64) -> f64 {
        (rho / (1.0 - rho)).ln() - self.z_epsilon() * rho
    }

    /// Grand-potential density per site, `f - μρ`.
    pub fn grand_potential_density(&self, rho: f64) -> f64 {
        self.free_energy_density(rho) - self.chemical_potential(rho) * rho
    }

    pub fn pressure(&self, rho: f64) -> f64 {
        -self.grand_potential_density(rho)
    }

    /// Densities bounding the mechanically unstable region, if there is one.
    ///
    /// The chemical potential is non-monotonic only for `z ε > 4`.
    pub fn spinodal(&self) -> Option<(f64, f64)> {
        let ze = self.z_epsilon();
        if ze <= 4.0 {
            return None;
        }
        let root = (1.0 - 4.0 / ze).sqrt();
        Some((0.5 * (1.0 - root), 0.5 * (1.0 + root)))
    }

    /// All densities in (0, 1) at which the bulk chemical potential equals `mu`,
    /// in increasing order.
    pub fn densities_at(&self, mu: f64) -> Vec<f64> {
        let lo = f64::EPSILON;
        let hi = 1.0 - f64::EPSILON;
        let increasing = |a: f64, b: f64| {
            let f = |rho: f64| self.chemical_potential(rho) - mu;
            if f(a) <= 0.0 && f(b) >= 0.0 {
                Some(bisect(f, a, b))
            } else {
                None
            }
        };
        match self.spinodal() {
            None => increasing(lo, hi).into_iter().collect(),
            Some((s1, s2)) => {
                let mut roots: Vec<f64> = increasing(lo, s1).into_iter().collect();
                let decreasing = |rho: f64| mu - self.chemical_potential(rho);
                if decreasing(s1) <= 0.0 && decreasing(s2) >= 0.0 {
                    roots.push(bisect(decreasing, s1, s2));
                }
                roots.extend(increasing(s2, hi));
                roots
            }
        }
    }

    /// The dilute and dense branch densities at chemical potential `mu`.
    ///
    /// Returns `None` unless three branches exist. At the coexistence
    /// chemical potential these are the vapour and liquid densities.
    pub fn branch_densities(&self, mu: f64) -> Option<(f64, f64)> {
        match self.densities_at(mu).as_slice() {
            [vapour, _, liquid] => Some((*vapour, *liquid)),
            _ => None,
        }
    }

    /// The chemical potential of vapour-liquid coexistence.
    ///
    /// The model is particle-hole symmetric, so coexistence sits at half
    /// filling: `μ = -z ε / 2`. Returns `None` above the critical temperature.
    pub fn coexistence_chemical_potential(&self) -> Option<f64> {
        self.spinodal().map(|_| -0.5 * self.z_epsilon())
    }
}
