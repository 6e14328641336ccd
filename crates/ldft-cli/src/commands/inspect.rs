use crate::cli::InspectArgs;
use crate::config::models::ModelKind;
use crate::error::Result;
use ldft::core::field::DensityField;
use ldft::core::io::load_state;
use ldft::engine::diagnostics;
use std::fmt::Write;
use tracing::info;

pub fn run(args: InspectArgs) -> Result<()> {
    let field = load_state(&args.state.dir, &args.state.name)?;
    let model = args
        .model
        .map(|kind| ModelKind::resolve(kind, args.epsilon))
        .transpose()?;
    info!(name = %args.state.name, "Inspecting saved state.");
    println!("{}", render(&field, model)?);
    Ok(())
}

/// The field summary, followed by its thermodynamic potentials if a model is given.
pub fn render(field: &DensityField, model: Option<ModelKind>) -> Result<String> {
    let mut out = field.to_string();
    let Some(model) = model else {
        return Ok(out);
    };

    let functional = model.build();
    let t = diagnostics::thermodynamics(functional.as_ref(), field)?;
    let numbers: Vec<String> = t.particle_numbers.iter().map(|n| format!("{n:.6}")).collect();
    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "\n{:<28}: {}\n{:<28}: {:.10}\n{:<28}: {:.10}\n{:<28}: {:.10}\n{:<28}: [{}]",
        "Model",
        model,
        "Free energy",
        t.free_energy,
        "Grand potential",
        t.grand_potential,
        "Semi-grand potential",
        t.semi_grand_potential,
        "Particle numbers",
        numbers.join(", ")
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use ldft::core::field::Constraint;
    use ldft::core::lattice::LatticeGeometry;
    use ldft::engine::config::ErrorNorm;
    use ldft::engine::error::EngineError;
    use ldft::engine::picard::PicardSolver;
    use ldft::core::functional::IdealLatticeGas;
    use ndarray::{ArrayD, IxDyn};

    fn field() -> DensityField {
        DensityField::with_profile(
            LatticeGeometry::periodic(vec![2, 2]).unwrap(),
            &[Constraint::AverageDensity(0.25)],
            vec![ArrayD::from_elem(IxDyn(&[2, 2]), 0.25)],
        )
        .unwrap()
    }

    #[test]
    fn summary_without_model_has_no_potentials() {
        let out = render(&field(), None).unwrap();
        assert!(out.contains("Iteration"));
        assert!(!out.contains("Free energy"));
    }

    #[test]
    fn model_adds_thermodynamic_potentials() {
        let mut field = field();
        let functional = IdealLatticeGas::new();
        PicardSolver::new(&functional)
            .step(&mut field, 1.0, ErrorNorm::SumOfSquares)
            .unwrap();

        let out = render(&field, Some(ModelKind::Ideal)).unwrap();
        assert!(out.contains("Free energy"));
        assert!(out.contains("Grand potential"));
        assert!(out.contains("[1.000000]"));
    }

    #[test]
    fn canonical_state_without_steps_cannot_report_grand_potential() {
        let result = render(&field(), Some(ModelKind::Ideal));
        assert!(matches!(result, Err(CliError::Core(EngineError::Field(_)))));
    }
}
