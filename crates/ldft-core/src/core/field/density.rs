use super::error::FieldError;
use super::history::{Checkpoint, History};
use super::species::{Constraint, Ensemble, SpeciesState};
use crate::core::lattice::{BoundaryTopology, LatticeGeometry};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The mutable multi-species state of a lattice DFT calculation.
///
/// A `DensityField` owns the current density profile of every species, the
/// external potentials, the chemical-potential / average-density bookkeeping,
/// the Picard iteration counter and the checkpoint history. It is mutated only
/// through [`set_field`](Self::set_field), [`set_history`](Self::set_history)
/// and the solver's step function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityField {
    geometry: LatticeGeometry,
    species: Vec<SpeciesState>,
    external_potentials: Vec<ArrayD<f64>>,
    densities: Option<Vec<ArrayD<f64>>>,
    history: History,
    iteration: usize,
    /// Per-species errors of the update that produced the current profile.
    #[serde(default)]
    step_errors: Vec<f64>,
}

impl DensityField {
    /// Creates a field without a density profile.
    ///
    /// External potentials default to zero everywhere.
    ///
    /// # Arguments
    ///
    /// * `geometry` - The lattice the field lives on.
    /// * `constraints` - One thermodynamic constraint per species.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError`] if no species is given or a constraint is invalid.
    pub fn new(geometry: LatticeGeometry, constraints: &[Constraint]) -> Result<Self, FieldError> {
        if constraints.is_empty() {
            return Err(FieldError::NoSpecies);
        }
        for (species, constraint) in constraints.iter().enumerate() {
            constraint.validate(species)?;
        }
        let external_potentials = constraints
            .iter()
            .map(|_| ArrayD::zeros(geometry.shape()))
            .collect();
        Ok(Self {
            species: constraints
                .iter()
                .copied()
                .map(SpeciesState::from_constraint)
                .collect(),
            external_potentials,
            densities: None,
            history: History::new(),
            iteration: 0,
            step_errors: Vec::new(),
            geometry,
        })
    }

    /// Creates a field and installs `profile` as the initial density.
    pub fn with_profile(
        geometry: LatticeGeometry,
        constraints: &[Constraint],
        profile: Vec<ArrayD<f64>>,
    ) -> Result<Self, FieldError> {
        let mut field = Self::new(geometry, constraints)?;
        field.set_field(profile)?;
        Ok(field)
    }

    /// Creates a field restored from a prior Picard history.
    ///
    /// See [`set_history`](Self::set_history) for the requirements on the
    /// three sequences.
    pub fn from_history(
        geometry: LatticeGeometry,
        constraints: &[Constraint],
        fields: Vec<Vec<ArrayD<f64>>>,
        indices: Vec<usize>,
        errors: Vec<Vec<f64>>,
    ) -> Result<Self, FieldError> {
        let mut field = Self::new(geometry, constraints)?;
        field.set_history(fields, indices, errors)?;
        Ok(field)
    }

    pub fn geometry(&self) -> &LatticeGeometry {
        &self.geometry
    }

    pub fn dim(&self) -> usize {
        self.geometry.dim()
    }

    pub fn topology(&self) -> BoundaryTopology {
        self.geometry.topology()
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    pub fn species(&self) -> &[SpeciesState] {
        &self.species
    }

    pub fn ensembles(&self) -> Vec<Ensemble> {
        self.species.iter().map(SpeciesState::ensemble).collect()
    }

    /// Chemical potential per species; `None` where not yet derived.
    pub fn chemical_potentials(&self) -> Vec<Option<f64>> {
        self.species
            .iter()
            .map(SpeciesState::chemical_potential)
            .collect()
    }

    /// Average density per species; `None` where not yet derived.
    pub fn average_densities(&self) -> Vec<Option<f64>> {
        self.species.iter().map(SpeciesState::average_density).collect()
    }

    /// The current density profile of every species, if one was assigned.
    pub fn densities(&self) -> Option<&[ArrayD<f64>]> {
        self.densities.as_deref()
    }

    pub fn density(&self, species: usize) -> Option<&ArrayD<f64>> {
        self.densities.as_ref().and_then(|d| d.get(species))
    }

    /// Like [`densities`](Self::densities) but fails for an empty field.
    pub fn require_densities(&self) -> Result<&[ArrayD<f64>], FieldError> {
        self.densities().ok_or(FieldError::Uninitialized)
    }

    pub fn external_potentials(&self) -> &[ArrayD<f64>] {
        &self.external_potentials
    }

    /// Whether any species feels a non-zero external potential.
    pub fn has_external_potential(&self) -> bool {
        self.external_potentials
            .iter()
            .any(|v| v.iter().any(|&x| x != 0.0))
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Per-species errors of every checkpoint, aligned with the history.
    pub fn error_history(&self) -> Vec<&[f64]> {
        self.history.errors()
    }

    /// Number of Picard updates applied since the last profile assignment.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Per-species errors of the Picard step that produced the current
    /// profile, or of the last loaded checkpoint. Empty for a fresh profile.
    pub fn last_step_errors(&self) -> &[f64] {
        &self.step_errors
    }

    /// Spatial mean of each species' current profile.
    pub fn mean_densities(&self) -> Result<Vec<f64>, FieldError> {
        Ok(self
            .require_densities()?
            .iter()
            .map(|r| r.mean().unwrap_or(0.0))
            .collect())
    }

    /// Replaces the external potential of one species.
    ///
    /// Potentials must be finite; hard walls are modelled by large values.
    pub fn set_external_potential(
        &mut self,
        species: usize,
        potential: ArrayD<f64>,
    ) -> Result<(), FieldError> {
        self.check_species(species)?;
        self.geometry.check_shape(potential.shape())?;
        if potential.iter().any(|x| !x.is_finite()) {
            return Err(FieldError::NonFinitePotential { species });
        }
        self.external_potentials[species] = potential;
        Ok(())
    }

    /// Replaces the constraint of one species.
    ///
    /// The species' ensemble follows the new constraint and the previously
    /// derived value is discarded. Profile, counter and history are kept, so a
    /// run can be resumed under the new condition.
    pub fn set_constraint(&mut self, species: usize, constraint: Constraint) -> Result<(), FieldError> {
        self.check_species(species)?;
        constraint.validate(species)?;
        self.species[species] = SpeciesState::from_constraint(constraint);
        Ok(())
    }

    /// Installs a new initial profile.
    ///
    /// Resets the iteration counter to 0 and clears the history.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError`] if the number of profiles differs from the
    /// number of species, a profile has the wrong shape, or contains
    /// non-finite values. Nothing is modified on error.
    pub fn set_field(&mut self, profile: Vec<ArrayD<f64>>) -> Result<(), FieldError> {
        self.check_profile(&profile)?;
        self.densities = Some(profile);
        self.iteration = 0;
        self.step_errors.clear();
        self.history.clear();
        Ok(())
    }

    /// Bulk-loads a Picard history.
    ///
    /// The last snapshot becomes the current profile and its index becomes
    /// the iteration counter.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError`] if the three sequences are not equal-length,
    /// empty, not strictly increasing, or any snapshot does not fit the
    /// lattice and species set. Nothing is modified on error.
    pub fn set_history(
        &mut self,
        fields: Vec<Vec<ArrayD<f64>>>,
        indices: Vec<usize>,
        errors: Vec<Vec<f64>>,
    ) -> Result<(), FieldError> {
        let history = History::from_parts(fields, indices, errors, self.species_count())?;
        for checkpoint in history.checkpoints() {
            self.check_profile(&checkpoint.densities)?;
        }
        let last = history.last().ok_or(FieldError::EmptyHistory)?;
        self.densities = Some(last.densities.clone());
        self.iteration = last.iteration;
        self.step_errors = last.errors.clone();
        self.history = history;
        Ok(())
    }

    /// Re-checks every invariant of a field, e.g. after deserialization.
    pub fn validate(&self) -> Result<(), FieldError> {
        if self.species.is_empty() {
            return Err(FieldError::NoSpecies);
        }
        if self.external_potentials.len() != self.species.len() {
            return Err(FieldError::SpeciesCount {
                expected: self.species.len(),
                found: self.external_potentials.len(),
            });
        }
        for (species, state) in self.species.iter().enumerate() {
            if state.constraint().is_none() {
                return Err(FieldError::InvalidConstraint {
                    species,
                    reason: format!("the authoritative value of a {} species is missing", state.ensemble()),
                });
            }
        }
        for (species, potential) in self.external_potentials.iter().enumerate() {
            self.geometry.check_shape(potential.shape())?;
            if potential.iter().any(|x| !x.is_finite()) {
                return Err(FieldError::NonFinitePotential { species });
            }
        }
        if let Some(densities) = &self.densities {
            self.check_profile(densities)?;
        }
        let mut previous: Option<usize> = None;
        for (position, checkpoint) in self.history.checkpoints().iter().enumerate() {
            if let Some(prev) = previous {
                if checkpoint.iteration <= prev {
                    return Err(FieldError::NonMonotonicHistory {
                        position,
                        previous: prev,
                        found: checkpoint.iteration,
                    });
                }
            }
            if checkpoint.errors.len() != self.species.len() {
                return Err(FieldError::ErrorWidth {
                    position,
                    expected: self.species.len(),
                    found: checkpoint.errors.len(),
                });
            }
            self.check_profile(&checkpoint.densities)?;
            previous = Some(checkpoint.iteration);
        }
        Ok(())
    }

    pub(crate) fn densities_mut(&mut self) -> Result<&mut [ArrayD<f64>], FieldError> {
        self.densities
            .as_deref_mut()
            .ok_or(FieldError::Uninitialized)
    }

    pub(crate) fn record_derived(&mut self, species: usize, value: f64) {
        self.species[species].record_derived(value);
    }

    pub(crate) fn advance(&mut self, errors: Vec<f64>) {
        self.iteration += 1;
        self.step_errors = errors;
    }

    /// Appends the current profile to the history under the current counter.
    ///
    /// Returns `false` without modifying anything if the counter is already
    /// recorded or no profile is assigned.
    pub(crate) fn snapshot(&mut self, errors: Vec<f64>) -> bool {
        if self.history.last_iteration() == Some(self.iteration) {
            return false;
        }
        let Some(densities) = self.densities.clone() else {
            return false;
        };
        self.history.push(Checkpoint {
            iteration: self.iteration,
            densities,
            errors,
        });
        true
    }

    /// Snapshots the current profile with the errors of the step that
    /// produced it.
    ///
    /// Returns `false` if the counter is already recorded, or if the profile
    /// did not come out of a Picard step (counter 0).
    pub(crate) fn snapshot_current(&mut self) -> bool {
        if self.iteration == 0 || self.step_errors.len() != self.species.len() {
            return false;
        }
        self.snapshot(self.step_errors.clone())
    }

    fn check_species(&self, species: usize) -> Result<(), FieldError> {
        if species >= self.species.len() {
            return Err(FieldError::SpeciesOutOfRange {
                index: species,
                count: self.species.len(),
            });
        }
        Ok(())
    }

    fn check_profile(&self, profile: &[ArrayD<f64>]) -> Result<(), FieldError> {
        if profile.len() != self.species.len() {
            return Err(FieldError::SpeciesCount {
                expected: self.species.len(),
                found: profile.len(),
            });
        }
        for (species, r) in profile.iter().enumerate() {
            self.geometry.check_shape(r.shape())?;
            if r.iter().any(|x| !x.is_finite()) {
                return Err(FieldError::NonFiniteProfile { species });
            }
        }
        Ok(())
    }
}

fn fmt_optional(values: &[Option<f64>]) -> String {
    let parts: Vec<String> = values
        .iter()
        .map(|v| v.map_or_else(|| "-".to_string(), |x| format!("{x:.6}")))
        .collect();
    format!("[{}]", parts.join(", "))
}

impl fmt::Display for DensityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ensembles: Vec<String> = self.species.iter().map(|s| s.ensemble().to_string()).collect();
        writeln!(f, "{:<28}: {}", "Lattice", self.geometry)?;
        writeln!(f, "{:<28}: {}", "Species", self.species.len())?;
        writeln!(f, "{:<28}: [{}]", "Ensembles", ensembles.join(", "))?;
        writeln!(f, "{:<28}: {}", "Chemical potential", fmt_optional(&self.chemical_potentials()))?;
        writeln!(f, "{:<28}: {}", "Average density", fmt_optional(&self.average_densities()))?;
        writeln!(
            f,
            "{:<28}: {}",
            "External potential",
            if self.has_external_potential() { "on" } else { "off" }
        )?;
        writeln!(
            f,
            "{:<28}: {}",
            "Density profile",
            if self.densities.is_some() { "assigned" } else { "empty" }
        )?;
        writeln!(f, "{:<28}: {}", "Iteration", self.iteration)?;
        let last_index = self
            .history
            .last_iteration()
            .map_or_else(|| "---".to_string(), |i| i.to_string());
        writeln!(f, "{:<28}: len={}, last entry={}", "History", self.history.len(), last_index)?;
        let last_error = self.history.last().map_or_else(
            || "---".to_string(),
            |cp| {
                let errs: Vec<String> = cp.errors.iter().map(|e| format!("{e:.3e}")).collect();
                format!("[{}]", errs.join(", "))
            },
        );
        write!(f, "{:<28}: {}", "Last error", last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn geometry() -> LatticeGeometry {
        LatticeGeometry::periodic(vec![2, 3]).unwrap()
    }

    fn uniform(value: f64) -> ArrayD<f64> {
        ArrayD::from_elem(IxDyn(&[2, 3]), value)
    }

    fn two_species() -> DensityField {
        DensityField::new(
            geometry(),
            &[
                Constraint::ChemicalPotential(-1.0),
                Constraint::AverageDensity(0.3),
            ],
        )
        .unwrap()
    }

    #[test]
    fn new_field_is_empty_with_zero_potentials() {
        let field = two_species();
        assert_eq!(field.species_count(), 2);
        assert!(field.densities().is_none());
        assert_eq!(field.iteration(), 0);
        assert!(field.history().is_empty());
        assert!(!field.has_external_potential());
        assert_eq!(field.chemical_potentials(), vec![Some(-1.0), None]);
        assert_eq!(field.average_densities(), vec![None, Some(0.3)]);
        assert_eq!(
            field.ensembles(),
            vec![Ensemble::GrandCanonical, Ensemble::Canonical]
        );
    }

    #[test]
    fn new_field_requires_species() {
        assert_eq!(DensityField::new(geometry(), &[]), Err(FieldError::NoSpecies));
    }

    #[test]
    fn set_field_resets_counter_and_history() {
        let mut field = two_species();
        field.set_field(vec![uniform(0.1), uniform(0.3)]).unwrap();
        field.advance(vec![3.0, 4.0]);
        field.advance(vec![1.0, 2.0]);
        assert!(field.snapshot(vec![1.0, 2.0]));
        assert_eq!(field.history().len(), 1);

        field.set_field(vec![uniform(0.2), uniform(0.3)]).unwrap();
        assert_eq!(field.iteration(), 0);
        assert!(field.history().is_empty());
        assert!(field.last_step_errors().is_empty());
        assert_eq!(field.density(0).unwrap(), &uniform(0.2));
    }

    #[test]
    fn set_field_rejects_bad_profiles_without_modification() {
        let mut field = two_species();
        field.set_field(vec![uniform(0.1), uniform(0.3)]).unwrap();
        assert!(matches!(
            field.set_field(vec![uniform(0.1)]),
            Err(FieldError::SpeciesCount { expected: 2, found: 1 })
        ));
        assert!(matches!(
            field.set_field(vec![uniform(0.1), ArrayD::zeros(IxDyn(&[3, 2]))]),
            Err(FieldError::Geometry(_))
        ));
        assert!(matches!(
            field.set_field(vec![uniform(f64::NAN), uniform(0.3)]),
            Err(FieldError::NonFiniteProfile { species: 0 })
        ));
        assert_eq!(field.density(0).unwrap(), &uniform(0.1));
    }

    #[test]
    fn set_history_adopts_last_snapshot_and_index() {
        let mut field = two_species();
        field
            .set_history(
                vec![
                    vec![uniform(0.1), uniform(0.3)],
                    vec![uniform(0.2), uniform(0.3)],
                ],
                vec![0, 40],
                vec![vec![1.0, 1.0], vec![0.1, 0.2]],
            )
            .unwrap();
        assert_eq!(field.iteration(), 40);
        assert_eq!(field.density(0).unwrap(), &uniform(0.2));
        assert_eq!(field.history().iterations(), vec![0, 40]);
        assert_eq!(field.error_history()[1], &[0.1, 0.2]);
        assert_eq!(field.last_step_errors(), &[0.1, 0.2]);
    }

    #[test]
    fn set_history_rejects_misaligned_sequences() {
        let mut field = two_species();
        let result = field.set_history(
            vec![vec![uniform(0.1), uniform(0.3)]],
            vec![0, 1],
            vec![vec![1.0, 1.0]],
        );
        assert!(matches!(result, Err(FieldError::HistoryLength { .. })));
        assert!(field.densities().is_none());
    }

    #[test]
    fn snapshot_skips_already_recorded_iteration() {
        let mut field = two_species();
        assert!(!field.snapshot(vec![0.0, 0.0]));
        field.set_field(vec![uniform(0.1), uniform(0.3)]).unwrap();
        field.advance(vec![0.5, 0.5]);
        assert!(field.snapshot(vec![0.5, 0.5]));
        assert!(!field.snapshot(vec![0.4, 0.4]));
        assert_eq!(field.history().len(), 1);
    }

    #[test]
    fn snapshot_current_uses_the_last_step_errors() {
        let mut field = two_species();
        field.set_field(vec![uniform(0.1), uniform(0.3)]).unwrap();
        assert!(!field.snapshot_current());

        field.advance(vec![0.25, 0.75]);
        assert!(field.snapshot_current());
        assert!(!field.snapshot_current());
        assert_eq!(field.history().iterations(), vec![1]);
        assert_eq!(field.error_history()[0], &[0.25, 0.75]);
    }

    #[test]
    fn set_external_potential_validates_shape_and_index() {
        let mut field = two_species();
        field.set_external_potential(1, uniform(2.0)).unwrap();
        assert!(field.has_external_potential());
        assert!(matches!(
            field.set_external_potential(2, uniform(0.0)),
            Err(FieldError::SpeciesOutOfRange { index: 2, count: 2 })
        ));
        assert!(field
            .set_external_potential(0, ArrayD::zeros(IxDyn(&[2, 2])))
            .is_err());
        assert_eq!(
            field.set_external_potential(0, uniform(f64::INFINITY)),
            Err(FieldError::NonFinitePotential { species: 0 })
        );
    }

    #[test]
    fn set_constraint_switches_ensemble() {
        let mut field = two_species();
        field.set_constraint(0, Constraint::AverageDensity(0.4)).unwrap();
        assert_eq!(field.ensembles()[0], Ensemble::Canonical);
        assert_eq!(field.average_densities()[0], Some(0.4));
        assert!(field.set_constraint(0, Constraint::AverageDensity(1.5)).is_err());
    }

    #[test]
    fn display_summarizes_state() {
        let mut field = two_species();
        field.set_field(vec![uniform(0.1), uniform(0.3)]).unwrap();
        let text = field.to_string();
        assert!(text.contains("2x3 (periodic)"));
        assert!(text.contains("grand-canonical, canonical"));
        assert!(text.contains("len=0, last entry=---"));
    }
}
