use crate::cli::RunArgs;
use crate::config::PartialRunConfig;
use crate::config::models::RunPlan;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use ldft::core::field::DensityField;
use ldft::core::io::load_state;
use ldft::engine::error::EngineError;
use ldft::engine::progress::ProgressReporter;
use ldft::engine::state::RunOutcome;
use ldft::workflows::{self, relax::InitialCondition, relax::RelaxResult};
use tracing::{info, warn};

pub fn run(args: RunArgs) -> Result<()> {
    let partial_config = PartialRunConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let plan = partial_config.merge_with_cli(&args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Relaxing {} species on {} with the {} model...",
        plan.constraints.len(),
        plan.geometry,
        plan.model
    );
    let result = execute(&plan, &reporter)?;
    let report = &result.report;

    match &report.outcome {
        RunOutcome::Converged => println!(
            "✓ Converged after {} step(s) at iteration {} (max error {:.3e}).",
            report.steps,
            report.iteration,
            report.max_error().unwrap_or(0.0)
        ),
        RunOutcome::Exhausted => {
            warn!(steps = report.steps, "Step budget exhausted before convergence.");
            println!(
                "Warning: stopped after {} step(s) at iteration {} (max error {:.3e}).",
                report.steps,
                report.iteration,
                report.max_error().unwrap_or(f64::NAN)
            );
        }
        RunOutcome::Diverged(cause) => {
            println!("✗ Diverged after {} step(s): {}", report.steps, cause);
        }
    }

    if let Some(t) = &result.thermodynamics {
        println!("  Free energy           : {:.10}", t.free_energy);
        println!("  Grand potential       : {:.10}", t.grand_potential);
        println!("  Semi-grand potential  : {:.10}", t.semi_grand_potential);
    }
    if let Some(path) = &result.saved_to {
        println!("  State written to      : {}", path.display());
    }

    match result.report.outcome {
        RunOutcome::Diverged(cause) => Err(EngineError::NumericalDivergence(cause).into()),
        _ => Ok(()),
    }
}

/// Builds or loads the field a plan describes and relaxes it.
pub fn execute(plan: &RunPlan, reporter: &ProgressReporter) -> Result<RelaxResult> {
    let mut field = match (&plan.relax.initial, &plan.relax.output) {
        (InitialCondition::Resume, Some(target)) => {
            info!(directory = ?target.directory, name = %target.name, "Resuming from saved state.");
            let mut field = load_state(&target.directory, &target.name)?;
            if field.geometry() != &plan.geometry {
                return Err(CliError::Config(format!(
                    "Saved lattice ({}) does not match the run file ({}).",
                    field.geometry(),
                    plan.geometry
                )));
            }
            if field.species_count() != plan.constraints.len() {
                return Err(CliError::Config(format!(
                    "Saved state holds {} species, the run file {}.",
                    field.species_count(),
                    plan.constraints.len()
                )));
            }
            for (species, &constraint) in plan.constraints.iter().enumerate() {
                field
                    .set_constraint(species, constraint)
                    .map_err(EngineError::from)?;
            }
            field
        }
        (InitialCondition::Resume, None) => {
            return Err(CliError::Config(
                "Resuming requires an output location to load from.".to_string(),
            ));
        }
        (InitialCondition::Profile { .. }, _) => {
            DensityField::new(plan.geometry.clone(), &plan.constraints).map_err(EngineError::from)?
        }
    };

    let functional = plan.model.build();
    info!("Invoking the relaxation workflow...");
    Ok(workflows::relax::run(
        &mut field,
        functional.as_ref(),
        &plan.relax,
        reporter,
    )?)
}
