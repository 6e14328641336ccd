use crate::core::field::{DensityField, Nucleus};
use crate::core::functional::Functional;
use crate::core::io::save_state;
use crate::engine::config::SolverConfig;
use crate::engine::diagnostics::{self, Thermodynamics};
use crate::engine::error::EngineError;
use crate::engine::picard::PicardSolver;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::{RunOutcome, RunReport};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// How the field is prepared before iterating.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialCondition {
    /// Continue from the field's current profile and counter.
    Resume,
    /// Install a fresh profile (homogeneous or nucleated) for every species.
    Profile {
        densities: Vec<f64>,
        nuclei: Vec<Option<Nucleus>>,
    },
}

/// Where the relaxed field is written.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTarget {
    pub directory: PathBuf,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelaxConfig {
    pub solver: SolverConfig,
    pub initial: InitialCondition,
    pub output: Option<OutputTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelaxResult {
    pub report: RunReport,
    /// `None` if the run diverged or the potentials could not be evaluated.
    pub thermodynamics: Option<Thermodynamics>,
    pub saved_to: Option<PathBuf>,
}

/// Relaxes a density field: prepares the initial profile, runs the Picard
/// iteration, evaluates the thermodynamic potentials and persists the result.
///
/// A diverged or exhausted run is not an error here; inspect
/// [`RelaxResult::report`] or call [`RunReport::into_result`].
#[instrument(skip_all, name = "relax_workflow", fields(functional = functional.name()))]
pub fn run<F: Functional + ?Sized>(
    field: &mut DensityField,
    functional: &F,
    config: &RelaxConfig,
    reporter: &ProgressReporter,
) -> Result<RelaxResult, EngineError> {
    config.solver.validate()?;

    if let InitialCondition::Profile { densities, nuclei } = &config.initial {
        field.create_init_profile(densities, nuclei)?;
        info!(species = field.species_count(), "Installed initial density profile.");
    } else {
        info!(iteration = field.iteration(), "Resuming from the current density profile.");
    }

    let report = PicardSolver::new(functional)
        .with_reporter(reporter)
        .run(field, &config.solver)?;

    let thermodynamics = match report.outcome {
        RunOutcome::Diverged(_) => None,
        _ => match diagnostics::thermodynamics(functional, field) {
            Ok(t) => {
                info!(
                    free_energy = t.free_energy,
                    grand_potential = t.grand_potential,
                    "Evaluated thermodynamic potentials."
                );
                Some(t)
            }
            Err(e) => {
                warn!(error = %e, "Could not evaluate thermodynamic potentials.");
                None
            }
        },
    };

    let saved_to = match &config.output {
        Some(target) => {
            let path = save_state(field, &target.directory, &target.name)?;
            reporter.report(Progress::Message(format!("Saved state to {}", path.display())));
            Some(path)
        }
        None => None,
    };

    Ok(RelaxResult {
        report,
        thermodynamics,
        saved_to,
    })
}
