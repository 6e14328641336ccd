use super::checkpoint::next_checkpoint;
use super::config::{DivergenceGuard, ErrorNorm, SolverConfig, validate_damping};
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::state::{DivergenceError, DivergentQuantity, RunOutcome, RunReport};
use crate::core::field::{Constraint, DensityField, FieldError};
use crate::core::functional::{Functional, FunctionalError, IdealTerm};
use ndarray::{ArrayD, Zip};
use tracing::{debug, info, instrument, trace, warn};

/// The iterated field of one step, computed without touching the state.
struct Update {
    densities: Vec<ArrayD<f64>>,
    derived: Vec<f64>,
    errors: Vec<f64>,
}

/// Damped Picard (fixed-point) iteration of the Euler-Lagrange equations of
/// a lattice functional.
///
/// Each step evaluates the excess chemical potential of the current field,
/// builds the iterated density of every species from its thermodynamic
/// constraint and mixes it into the field with damping `α`:
///
/// ```text
/// grand-canonical: r'_i = f(μ_i - v_i - μ_ex,i)
/// canonical:       r'_i = f(μ_i - v_i - μ_ex,i), μ_i chosen so that <r'_i> = ρ_i
/// r_i <- (1 - α) r_i + α r'_i
/// ```
pub struct PicardSolver<'a, F: Functional + ?Sized> {
    functional: &'a F,
    reporter: Option<&'a ProgressReporter<'a>>,
}

impl<'a, F: Functional + ?Sized> PicardSolver<'a, F> {
    pub fn new(functional: &'a F) -> Self {
        Self {
            functional,
            reporter: None,
        }
    }

    pub fn with_reporter(mut self, reporter: &'a ProgressReporter<'a>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    fn report(&self, event: Progress) {
        if let Some(reporter) = self.reporter {
            reporter.report(event);
        }
    }

    /// Applies a single damped Picard update to `field`.
    ///
    /// Returns the per-species error between the iterated and the previous
    /// density. On failure the field is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for a damping outside (0, 1],
    /// [`EngineError::NumericalDivergence`] if the update produced unusable
    /// values, and other variants if the field or functional are invalid.
    #[instrument(skip_all, name = "picard_step", fields(iteration = field.iteration() + 1))]
    pub fn step(
        &self,
        field: &mut DensityField,
        damping: f64,
        norm: ErrorNorm,
    ) -> Result<Vec<f64>, EngineError> {
        validate_damping(damping)?;
        let update = self.iterate(field, norm)?;
        apply(field, update, damping)
    }

    /// Runs up to `config.max_steps` Picard steps.
    ///
    /// The field is snapshotted into its history whenever the iteration
    /// counter reaches the next checkpoint of the configured schedule, and
    /// once more at the end of the run unless the final state is already
    /// recorded. This also holds when the run takes no step after earlier
    /// calls to [`step`](Self::step) moved the counter. A divergent step stops the run; it is reported in the
    /// returned [`RunReport`] and never stored.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] for an invalid configuration, an empty field,
    /// or a functional failure unrelated to divergence.
    #[instrument(skip_all, name = "picard_run", fields(functional = self.functional.name()))]
    pub fn run(&self, field: &mut DensityField, config: &SolverConfig) -> Result<RunReport, EngineError> {
        config.validate()?;
        field.require_densities()?;

        let start = field.iteration();
        info!(
            start_iteration = start,
            max_steps = config.max_steps,
            damping = config.damping,
            checkpoints = %config.checkpoints,
            "Starting Picard iteration."
        );
        self.report(Progress::RunStart {
            max_steps: config.max_steps as u64,
            start_iteration: start,
        });

        let mut next = next_checkpoint(start, config.checkpoints);
        let mut best: Vec<f64> = Vec::new();
        let mut last_errors: Vec<f64> = Vec::new();
        let mut steps = 0;
        let mut checkpoints = 0;
        let mut outcome = RunOutcome::Exhausted;

        while steps < config.max_steps {
            let iterated = self.iterate(field, config.error_norm).and_then(|update| {
                check_growth(&config.divergence, &best, &update, field.iteration() + 1)?;
                Ok(update)
            });
            let update = match iterated {
                Ok(update) => update,
                Err(EngineError::NumericalDivergence(cause)) => {
                    outcome = RunOutcome::Diverged(cause);
                    break;
                }
                Err(e) => return Err(e),
            };
            record_best(&mut best, &update.errors);

            let errors = apply(field, update, config.damping)?;
            steps += 1;
            let max_error = errors.iter().copied().fold(0.0, f64::max);
            trace!(iteration = field.iteration(), max_error, "Picard step finished.");
            self.report(Progress::StepFinish {
                iteration: field.iteration(),
                max_error,
            });

            if field.iteration() >= next {
                if field.snapshot(errors.clone()) {
                    checkpoints += 1;
                    info!(iteration = field.iteration(), max_error, "Checkpoint.");
                    self.report(Progress::Checkpoint {
                        iteration: field.iteration(),
                        errors: errors.clone(),
                    });
                }
                next = next_checkpoint(field.iteration(), config.checkpoints);
            }

            last_errors = errors;
            if config
                .min_error
                .is_some_and(|threshold| last_errors.iter().all(|&e| e < threshold))
            {
                outcome = RunOutcome::Converged;
                break;
            }
        }

        if field.snapshot_current() {
            checkpoints += 1;
            debug!(iteration = field.iteration(), "Recorded terminal snapshot.");
        }

        match &outcome {
            RunOutcome::Converged => info!(
                steps,
                iteration = field.iteration(),
                "Picard iteration converged."
            ),
            RunOutcome::Exhausted => info!(
                steps,
                iteration = field.iteration(),
                "Picard iteration reached the step limit."
            ),
            RunOutcome::Diverged(cause) => warn!(
                steps,
                iteration = field.iteration(),
                %cause,
                "Picard iteration diverged."
            ),
        }
        self.report(Progress::RunFinish);

        Ok(RunReport {
            outcome,
            steps,
            iteration: field.iteration(),
            errors: last_errors,
            checkpoints,
        })
    }

    fn iterate(&self, field: &DensityField, norm: ErrorNorm) -> Result<Update, EngineError> {
        let iteration = field.iteration() + 1;
        let count = field.species_count();
        let mu_ex = match self.functional.excess_chemical_potential(field) {
            Ok(mu_ex) => mu_ex,
            Err(FunctionalError::DensityOutOfRange { species, value }) => {
                return Err(DivergenceError::OutOfDomain {
                    species,
                    iteration,
                    value,
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };
        if mu_ex.len() != count {
            return Err(FunctionalError::SpeciesCount {
                name: self.functional.name(),
                supported: mu_ex.len(),
                found: count,
            }
            .into());
        }

        let densities = field.require_densities()?;
        let ideal = self.functional.ideal_term();
        let non_finite = |species, quantity| {
            EngineError::from(DivergenceError::NonFinite {
                species,
                iteration,
                quantity,
            })
        };

        let mut update = Update {
            densities: Vec::with_capacity(count),
            derived: Vec::with_capacity(count),
            errors: Vec::with_capacity(count),
        };
        for (species, (mut exponent, (state, (v, previous)))) in mu_ex
            .into_iter()
            .zip(
                field
                    .species()
                    .iter()
                    .zip(field.external_potentials().iter().zip(densities)),
            )
            .enumerate()
        {
            field.geometry().check_shape(exponent.shape())?;
            if exponent.iter().any(|x| !x.is_finite()) {
                return Err(non_finite(species, DivergentQuantity::ExcessChemicalPotential));
            }
            Zip::from(&mut exponent)
                .and(v)
                .for_each(|e, &v| *e = -v - *e);

            let constraint = state.constraint().ok_or_else(|| FieldError::InvalidConstraint {
                species,
                reason: "no authoritative value".to_string(),
            })?;
            let (iterated, derived, quantity) = match constraint {
                Constraint::ChemicalPotential(mu) => {
                    let iterated = occupation(&exponent, mu, ideal);
                    let mean = iterated.mean().unwrap_or(f64::NAN);
                    (iterated, mean, DivergentQuantity::AverageDensity)
                }
                Constraint::AverageDensity(rho) => {
                    let (iterated, mu) = self
                        .functional
                        .normalize_to_density(species, &exponent, rho)?;
                    (iterated, mu, DivergentQuantity::ChemicalPotential)
                }
            };

            if iterated.iter().any(|x| !x.is_finite()) {
                return Err(non_finite(species, DivergentQuantity::Density));
            }
            if !derived.is_finite() {
                return Err(non_finite(species, quantity));
            }
            let error = norm.measure(&iterated, previous);
            if !error.is_finite() {
                return Err(non_finite(species, DivergentQuantity::Error));
            }

            update.densities.push(iterated);
            update.derived.push(derived);
            update.errors.push(error);
        }
        Ok(update)
    }
}

#[cfg(not(feature = "parallel"))]
fn occupation(exponent: &ArrayD<f64>, mu: f64, ideal: IdealTerm) -> ArrayD<f64> {
    exponent.mapv(|x| ideal.occupation(mu + x))
}

#[cfg(feature = "parallel")]
fn occupation(exponent: &ArrayD<f64>, mu: f64, ideal: IdealTerm) -> ArrayD<f64> {
    Zip::from(exponent).par_map_collect(|&x| ideal.occupation(mu + x))
}

/// Mixes the iterated densities into the field and advances the counter.
fn apply(field: &mut DensityField, update: Update, damping: f64) -> Result<Vec<f64>, EngineError> {
    let Update {
        densities,
        derived,
        errors,
    } = update;
    let current = field.densities_mut()?;
    for (r, iterated) in current.iter_mut().zip(&densities) {
        let zip = Zip::from(r).and(iterated);
        #[cfg(not(feature = "parallel"))]
        zip.for_each(|r, &n| *r = (1.0 - damping) * *r + damping * n);
        #[cfg(feature = "parallel")]
        zip.par_for_each(|r, &n| *r = (1.0 - damping) * *r + damping * n);
    }
    for (species, value) in derived.into_iter().enumerate() {
        field.record_derived(species, value);
    }
    field.advance(errors.clone());
    Ok(errors)
}

fn record_best(best: &mut Vec<f64>, errors: &[f64]) {
    if best.len() != errors.len() {
        *best = errors.to_vec();
        return;
    }
    for (b, &e) in best.iter_mut().zip(errors) {
        *b = b.min(e);
    }
}

fn check_growth(
    guard: &DivergenceGuard,
    best: &[f64],
    update: &Update,
    iteration: usize,
) -> Result<(), EngineError> {
    let Some(limit) = guard.max_error_growth else {
        return Ok(());
    };
    for (species, (&error, &best)) in update.errors.iter().zip(best).enumerate() {
        if best > 0.0 && error > limit * best {
            return Err(DivergenceError::ErrorGrowth {
                species,
                iteration,
                error,
                best,
                limit,
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::functional::{IdealLatticeGas, MeanFieldLatticeGas};
    use crate::core::lattice::LatticeGeometry;
    use crate::engine::checkpoint::CheckpointMethod;
    use crate::engine::config::ConfigError;
    use ndarray::IxDyn;
    use std::sync::Mutex;

    fn uniform(size: &[usize], value: f64) -> ArrayD<f64> {
        ArrayD::from_elem(IxDyn(size), value)
    }

    fn two_site_field(constraint: Constraint, start: f64) -> DensityField {
        let g = LatticeGeometry::periodic(vec![2, 1]).unwrap();
        DensityField::with_profile(g, &[constraint], vec![uniform(&[2, 1], start)]).unwrap()
    }

    fn config(damping: f64, max_steps: usize) -> SolverConfig {
        SolverConfig::builder()
            .damping(damping)
            .max_steps(max_steps)
            .checkpoints(CheckpointMethod::Constant(10))
            .min_error(1e-12)
            .build()
            .unwrap()
    }

    /// A functional with a uniform excess chemical potential that depends
    /// only on how often it has been evaluated.
    struct Scripted {
        calls: Mutex<usize>,
        script: fn(usize) -> f64,
    }

    impl Scripted {
        fn new(script: fn(usize) -> f64) -> Self {
            Self {
                calls: Mutex::new(0),
                script,
            }
        }
    }

    impl Functional for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn excess_chemical_potential(
            &self,
            field: &DensityField,
        ) -> Result<Vec<ArrayD<f64>>, FunctionalError> {
            let mut calls = self.calls.lock().unwrap();
            let value = (self.script)(*calls);
            *calls += 1;
            Ok(field
                .require_densities()?
                .iter()
                .map(|r| ArrayD::from_elem(r.raw_dim(), value))
                .collect())
        }

        fn free_energy(&self, _field: &DensityField) -> Result<f64, FunctionalError> {
            Ok(0.0)
        }
    }

    #[test]
    fn ideal_gas_on_two_sites_converges_to_activity() {
        let mu: f64 = -1.3;
        let mut field = two_site_field(Constraint::ChemicalPotential(mu), 0.05);
        let functional = IdealLatticeGas::new();
        let solver = PicardSolver::new(&functional);
        let report = solver.run(&mut field, &config(0.5, 200)).unwrap();

        assert!(report.is_converged());
        assert!(report.steps < 200);
        for &r in field.density(0).unwrap() {
            assert!((r - mu.exp()).abs() < 1e-5);
        }
        let derived = field.average_densities()[0].unwrap();
        assert!((derived - mu.exp()).abs() < 1e-12);
    }

    #[test]
    fn ideal_gas_from_half_filling_converges_to_activity() {
        let mu: f64 = -1.3;
        let mut field = two_site_field(Constraint::ChemicalPotential(mu), 0.5);
        let functional = IdealLatticeGas::new();
        let solver = PicardSolver::new(&functional);
        let report = solver.run(&mut field, &config(0.5, 200)).unwrap();

        assert!(report.is_converged());
        assert!(report.steps < 200);
        for &r in field.density(0).unwrap() {
            assert!((r - mu.exp()).abs() < 1e-5);
        }
        assert_eq!(field.history().last_iteration(), Some(report.iteration));
    }

    #[test]
    fn logistic_ideal_gas_converges_to_fermi_occupation() {
        let mu = 0.4;
        let mut field = two_site_field(Constraint::ChemicalPotential(mu), 0.5);
        let functional = IdealLatticeGas::with_exclusion();
        let solver = PicardSolver::new(&functional);
        let report = solver.run(&mut field, &config(0.5, 200)).unwrap();

        assert!(report.is_converged());
        let expected = IdealTerm::Logistic.occupation(mu);
        for &r in field.density(0).unwrap() {
            assert!((r - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn undamped_step_replaces_the_field_with_the_iterate() {
        let mu: f64 = -2.0;
        let mut field = two_site_field(Constraint::ChemicalPotential(mu), 0.3);
        let functional = IdealLatticeGas::new();
        let solver = PicardSolver::new(&functional);
        let errors = solver.step(&mut field, 1.0, ErrorNorm::SumOfSquares).unwrap();

        assert_eq!(field.iteration(), 1);
        assert!(field.density(0).unwrap().iter().all(|&r| r == mu.exp()));
        let expected = 2.0 * (mu.exp() - 0.3).powi(2);
        assert!((errors[0] - expected).abs() < 1e-15);
    }

    #[test]
    fn step_rejects_damping_above_one_without_modification() {
        let mut field = two_site_field(Constraint::ChemicalPotential(-1.0), 0.3);
        let before = field.clone();
        let functional = IdealLatticeGas::new();
        let solver = PicardSolver::new(&functional);
        let result = solver.step(&mut field, 1.5, ErrorNorm::SumOfSquares);
        assert!(matches!(
            result,
            Err(EngineError::Config(ConfigError::InvalidParameter { name: "damping", .. }))
        ));
        assert_eq!(field, before);
    }

    #[test]
    fn run_rejects_invalid_config_before_stepping() {
        let mut field = two_site_field(Constraint::ChemicalPotential(-1.0), 0.3);
        let mut bad = config(0.5, 10);
        bad.damping = 1.5;
        let functional = IdealLatticeGas::new();
        let solver = PicardSolver::new(&functional);
        assert!(matches!(solver.run(&mut field, &bad), Err(EngineError::Config(_))));
        assert_eq!(field.iteration(), 0);
    }

    #[test]
    fn run_requires_an_initial_profile() {
        let g = LatticeGeometry::periodic(vec![2, 2]).unwrap();
        let mut field = DensityField::new(g, &[Constraint::ChemicalPotential(0.0)]).unwrap();
        let functional = IdealLatticeGas::new();
        let solver = PicardSolver::new(&functional);
        assert!(matches!(
            solver.run(&mut field, &config(0.5, 10)),
            Err(EngineError::Field(FieldError::Uninitialized))
        ));
    }

    #[test]
    fn history_is_monotone_and_ends_at_the_counter() {
        let mut field = two_site_field(Constraint::ChemicalPotential(-1.0), 0.1);
        let functional = IdealLatticeGas::new();
        let solver = PicardSolver::new(&functional);
        let cfg = SolverConfig::builder()
            .damping(0.1)
            .max_steps(35)
            .checkpoints(CheckpointMethod::Constant(10))
            .build()
            .unwrap();
        let report = solver.run(&mut field, &cfg).unwrap();

        assert_eq!(report.outcome, RunOutcome::Exhausted);
        assert_eq!(report.steps, 35);
        assert_eq!(field.history().iterations(), vec![10, 20, 30, 35]);
        assert_eq!(report.checkpoints, 4);
        assert_eq!(field.history().last_iteration(), Some(field.iteration()));
        assert_eq!(field.error_history().last().unwrap(), &report.errors.as_slice());

        // Resuming continues the counter and the schedule.
        let report = solver.run(&mut field, &cfg).unwrap();
        assert_eq!(report.iteration, 70);
        assert_eq!(
            field.history().iterations(),
            vec![10, 20, 30, 35, 40, 50, 60, 70]
        );
    }

    #[test]
    fn checkpoint_at_the_final_step_is_not_duplicated() {
        let mut field = two_site_field(Constraint::ChemicalPotential(-1.0), 0.1);
        let functional = IdealLatticeGas::new();
        let solver = PicardSolver::new(&functional);
        let cfg = SolverConfig::builder()
            .damping(0.1)
            .max_steps(20)
            .checkpoints(CheckpointMethod::Constant(10))
            .build()
            .unwrap();
        solver.run(&mut field, &cfg).unwrap();
        assert_eq!(field.history().iterations(), vec![10, 20]);
    }

    #[test]
    fn canonical_species_keeps_its_average_density() {
        let g = LatticeGeometry::periodic(vec![4, 4]).unwrap();
        let mut v = uniform(&[4, 4], 0.0);
        v[[0, 0]] = 2.0;
        v[[1, 1]] = -1.0;
        let mut field =
            DensityField::with_profile(g, &[Constraint::AverageDensity(0.2)], vec![uniform(&[4, 4], 0.2)])
                .unwrap();
        field.set_external_potential(0, v).unwrap();

        let functional = MeanFieldLatticeGas::new(0.5);
        let solver = PicardSolver::new(&functional);
        let report = solver.run(&mut field, &config(0.3, 2000)).unwrap();
        assert!(report.is_converged());

        let rho = field.density(0).unwrap();
        assert!((rho.mean().unwrap() - 0.2).abs() < 1e-12);
        assert!(rho[[1, 1]] > rho[[2, 2]] && rho[[2, 2]] > rho[[0, 0]]);
        assert!(field.chemical_potentials()[0].is_some());
    }

    #[test]
    fn divergent_step_is_reported_and_not_stored() {
        let mut field = two_site_field(Constraint::ChemicalPotential(-1.0), 0.1);
        let functional = Scripted::new(|call| if call == 3 { f64::NAN } else { 0.0 });
        let solver = PicardSolver::new(&functional);
        let report = solver.run(&mut field, &config(0.5, 50)).unwrap();

        assert!(matches!(
            report.outcome,
            RunOutcome::Diverged(DivergenceError::NonFinite {
                species: 0,
                iteration: 4,
                quantity: DivergentQuantity::ExcessChemicalPotential,
            })
        ));
        assert_eq!(report.steps, 3);
        assert_eq!(field.iteration(), 3);
        assert_eq!(field.history().iterations(), vec![3]);
        assert!(field.density(0).unwrap().iter().all(|x| x.is_finite()));
        assert!(matches!(
            report.into_result(),
            Err(EngineError::NumericalDivergence(_))
        ));
    }

    #[test]
    fn run_without_steps_records_the_stepped_field() {
        let mut field = two_site_field(Constraint::ChemicalPotential(-1.0), 0.1);
        let functional = IdealLatticeGas::new();
        let solver = PicardSolver::new(&functional);
        let mut errors = Vec::new();
        for _ in 0..3 {
            errors = solver.step(&mut field, 0.5, ErrorNorm::SumOfSquares).unwrap();
        }
        assert!(field.history().is_empty());

        let report = solver.run(&mut field, &config(0.5, 0)).unwrap();
        assert_eq!(report.outcome, RunOutcome::Exhausted);
        assert_eq!(report.steps, 0);
        assert_eq!(report.checkpoints, 1);
        assert_eq!(field.history().iterations(), vec![3]);
        assert_eq!(field.error_history()[0], errors.as_slice());
        assert_eq!(field.history().last().unwrap().densities, field.densities().unwrap());
    }

    #[test]
    fn divergence_on_the_first_run_step_records_the_stepped_field() {
        let mut field = two_site_field(Constraint::ChemicalPotential(-1.0), 0.1);
        let functional = Scripted::new(|call| if call == 1 { f64::NAN } else { 0.0 });
        let solver = PicardSolver::new(&functional);
        let errors = solver.step(&mut field, 0.5, ErrorNorm::SumOfSquares).unwrap();

        let report = solver.run(&mut field, &config(0.5, 50)).unwrap();
        assert!(matches!(report.outcome, RunOutcome::Diverged(_)));
        assert_eq!(report.steps, 0);
        assert_eq!(field.iteration(), 1);
        assert_eq!(field.history().iterations(), vec![1]);
        assert_eq!(field.error_history()[0], errors.as_slice());
    }

    #[test]
    fn run_without_steps_on_a_fresh_profile_records_nothing() {
        let mut field = two_site_field(Constraint::ChemicalPotential(-1.0), 0.1);
        let functional = IdealLatticeGas::new();
        let solver = PicardSolver::new(&functional);
        let report = solver.run(&mut field, &config(0.5, 0)).unwrap();
        assert_eq!(report.checkpoints, 0);
        assert_eq!(field.iteration(), 0);
        assert!(field.history().is_empty());
    }

    #[test]
    fn error_growth_guard_stops_the_run() {
        // The iterate e^(-5 + n) outruns the damped field from the fourth step on.
        let mut field = two_site_field(Constraint::ChemicalPotential(-5.0), 0.1);
        let functional = Scripted::new(|call| -(call as f64));
        let cfg = SolverConfig::builder()
            .damping(0.5)
            .max_steps(50)
            .checkpoints(CheckpointMethod::Constant(100))
            .divergence(DivergenceGuard::with_max_growth(1.5))
            .build()
            .unwrap();
        let solver = PicardSolver::new(&functional);
        let before_last = {
            let mut probe = field.clone();
            let probe_functional = Scripted::new(|call| -(call as f64));
            let probe_solver = PicardSolver::new(&probe_functional);
            for _ in 0..3 {
                probe_solver
                    .step(&mut probe, 0.5, ErrorNorm::SumOfSquares)
                    .unwrap();
            }
            probe
        };
        let report = solver.run(&mut field, &cfg).unwrap();

        match report.outcome {
            RunOutcome::Diverged(DivergenceError::ErrorGrowth {
                species,
                iteration,
                error,
                best,
                limit,
            }) => {
                assert_eq!((species, iteration), (0, 4));
                assert!(error > limit * best);
            }
            other => panic!("expected error growth, got {other:?}"),
        }
        assert_eq!(report.steps, 3);
        assert_eq!(field.density(0), before_last.density(0));
    }

    #[test]
    fn progress_events_follow_the_run() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            let tag = match event {
                Progress::RunStart { .. } => "start",
                Progress::StepFinish { .. } => "step",
                Progress::Checkpoint { .. } => "checkpoint",
                Progress::RunFinish => "finish",
                Progress::Message(_) => "message",
            };
            events.lock().unwrap().push(tag);
        }));
        let mut field = two_site_field(Constraint::ChemicalPotential(-1.0), 0.1);
        let functional = IdealLatticeGas::new();
        let solver = PicardSolver::new(&functional).with_reporter(&reporter);
        let cfg = SolverConfig::builder()
            .damping(0.5)
            .max_steps(10)
            .checkpoints(CheckpointMethod::Constant(5))
            .build()
            .unwrap();
        solver.run(&mut field, &cfg).unwrap();
        drop(solver);
        drop(reporter);

        let events = events.into_inner().unwrap();
        assert_eq!(events.first(), Some(&"start"));
        assert_eq!(events.last(), Some(&"finish"));
        assert_eq!(events.iter().filter(|&&e| e == "step").count(), 10);
        assert_eq!(events.iter().filter(|&&e| e == "checkpoint").count(), 2);
    }
}
