use super::error::EngineError;
use crate::core::field::{DensityField, FieldError};
use crate::core::functional::Functional;
use serde::Serialize;

/// Thermodynamic potentials of the current density profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thermodynamics {
    pub free_energy: f64,
    /// Every species treated grand-canonically.
    pub grand_potential: f64,
    /// Only the grand-canonical species contribute `-μN`.
    pub semi_grand_potential: f64,
    /// Number of particles of every species.
    pub particle_numbers: Vec<f64>,
}

/// Number of particles of every species, `N_i = Σ ρ_i`.
pub fn particle_numbers(field: &DensityField) -> Result<Vec<f64>, EngineError> {
    Ok(field.require_densities()?.iter().map(|r| r.sum()).collect())
}

fn chemical_potential(field: &DensityField, species: usize) -> Result<f64, EngineError> {
    field.chemical_potentials()[species]
        .ok_or_else(|| FieldError::MissingChemicalPotential { species }.into())
}

/// `Ω = F - Σ_i μ_i N_i`.
///
/// Canonical species need a derived chemical potential, i.e. at least one
/// Picard step must have been taken.
pub fn grand_potential<F: Functional + ?Sized>(
    functional: &F,
    field: &DensityField,
) -> Result<f64, EngineError> {
    let mut omega = functional.free_energy(field)?;
    for (species, n) in particle_numbers(field)?.into_iter().enumerate() {
        omega -= chemical_potential(field, species)? * n;
    }
    Ok(omega)
}

/// `F - Σ μ_i N_i` over the grand-canonical species only.
pub fn semi_grand_potential<F: Functional + ?Sized>(
    functional: &F,
    field: &DensityField,
) -> Result<f64, EngineError> {
    let mut omega = functional.free_energy(field)?;
    for (species, n) in particle_numbers(field)?.into_iter().enumerate() {
        if field.species()[species].is_grand_canonical() {
            omega -= chemical_potential(field, species)? * n;
        }
    }
    Ok(omega)
}

pub fn thermodynamics<F: Functional + ?Sized>(
    functional: &F,
    field: &DensityField,
) -> Result<Thermodynamics, EngineError> {
    Ok(Thermodynamics {
        free_energy: functional.free_energy(field)?,
        grand_potential: grand_potential(functional, field)?,
        semi_grand_potential: semi_grand_potential(functional, field)?,
        particle_numbers: particle_numbers(field)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::Constraint;
    use crate::core::functional::{IdealLatticeGas, MeanFieldLatticeGas};
    use crate::core::lattice::LatticeGeometry;
    use crate::engine::config::ErrorNorm;
    use crate::engine::picard::PicardSolver;
    use ndarray::{ArrayD, IxDyn};

    fn mixed_field() -> DensityField {
        let g = LatticeGeometry::periodic(vec![2, 2]).unwrap();
        DensityField::with_profile(
            g,
            &[
                Constraint::ChemicalPotential(-1.0),
                Constraint::AverageDensity(0.25),
            ],
            vec![
                ArrayD::from_elem(IxDyn(&[2, 2]), 0.1),
                ArrayD::from_elem(IxDyn(&[2, 2]), 0.25),
            ],
        )
        .unwrap()
    }

    #[test]
    fn canonical_species_needs_a_derived_chemical_potential() {
        let field = mixed_field();
        let result = grand_potential(&IdealLatticeGas::new(), &field);
        assert!(matches!(
            result,
            Err(EngineError::Field(FieldError::MissingChemicalPotential { species: 1 }))
        ));
        // The semi-grand potential only needs the grand-canonical species.
        assert!(semi_grand_potential(&IdealLatticeGas::new(), &field).is_ok());
    }

    #[test]
    fn potentials_subtract_chemical_work() {
        let mut field = mixed_field();
        let functional = IdealLatticeGas::new();
        PicardSolver::new(&functional)
            .step(&mut field, 1.0, ErrorNorm::SumOfSquares)
            .unwrap();

        let t = thermodynamics(&functional, &field).unwrap();
        let mu = field.chemical_potentials();
        let (mu0, mu1) = (mu[0].unwrap(), mu[1].unwrap());
        let n = &t.particle_numbers;
        assert!((n[1] - 1.0).abs() < 1e-12);
        assert!((t.grand_potential - (t.free_energy - mu0 * n[0] - mu1 * n[1])).abs() < 1e-12);
        assert!((t.semi_grand_potential - (t.free_energy - mu0 * n[0])).abs() < 1e-12);
    }

    #[test]
    fn bulk_grand_potential_matches_uniform_field() {
        let rho: f64 = 0.3;
        let g = LatticeGeometry::periodic(vec![3, 3, 3]).unwrap();
        let model = MeanFieldLatticeGas::new(0.7);
        let bulk = model.bulk(3);
        let field = DensityField::with_profile(
            g,
            &[Constraint::ChemicalPotential(bulk.chemical_potential(rho))],
            vec![ArrayD::from_elem(IxDyn(&[3, 3, 3]), rho)],
        )
        .unwrap();
        let omega = grand_potential(&model, &field).unwrap();
        assert!((omega - 27.0 * bulk.grand_potential_density(rho)).abs() < 1e-10);
    }
}
