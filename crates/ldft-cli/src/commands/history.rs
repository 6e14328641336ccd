use crate::cli::HistoryArgs;
use crate::error::{CliError, Result};
use ldft::core::field::DensityField;
use ldft::core::io::load_state;
use std::fs::File;
use std::io::{self, Write};
use tracing::info;

pub fn run(args: HistoryArgs) -> Result<()> {
    let field = load_state(&args.state.dir, &args.state.name)?;

    let rows = match &args.output {
        Some(path) => {
            let rows = write_history(&field, File::create(path)?).map_err(|e| {
                CliError::FileParsing {
                    path: path.clone(),
                    source: e.into(),
                }
            })?;
            println!("✓ Wrote {} checkpoint(s) to {}", rows, path.display());
            rows
        }
        None => write_history(&field, io::stdout().lock()).map_err(|e| CliError::Other(e.into()))?,
    };
    info!(rows, "Exported checkpoint error history.");
    Ok(())
}

/// Writes one CSV row per checkpoint: the iteration index followed by the
/// error of every species. Returns the number of rows.
pub fn write_history<W: Write>(field: &DensityField, writer: W) -> csv::Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["iteration".to_string()];
    header.extend((0..field.species_count()).map(|s| format!("error_{s}")));
    wtr.write_record(&header)?;

    for checkpoint in field.history().checkpoints() {
        let mut record = vec![checkpoint.iteration.to_string()];
        record.extend(checkpoint.errors.iter().map(|e| format!("{e:e}")));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(field.history().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldft::core::field::Constraint;
    use ldft::core::lattice::LatticeGeometry;
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn rows_follow_the_checkpoints() {
        let mut field = DensityField::new(
            LatticeGeometry::periodic(vec![2, 2]).unwrap(),
            &[Constraint::ChemicalPotential(-1.0), Constraint::AverageDensity(0.5)],
        )
        .unwrap();
        let snapshot = |v: f64| {
            vec![
                ArrayD::from_elem(IxDyn(&[2, 2]), v),
                ArrayD::from_elem(IxDyn(&[2, 2]), 0.5),
            ]
        };
        field
            .set_history(
                vec![snapshot(0.1), snapshot(0.2)],
                vec![30, 60],
                vec![vec![0.5, 0.25], vec![0.125, 0.0]],
            )
            .unwrap();

        let mut buffer = Vec::new();
        let rows = write_history(&field, &mut buffer).unwrap();
        assert_eq!(rows, 2);
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "iteration,error_0,error_1\n30,5e-1,2.5e-1\n60,1.25e-1,0e0\n"
        );
    }

    #[test]
    fn empty_history_writes_only_the_header() {
        let field = DensityField::new(
            LatticeGeometry::periodic(vec![2, 2]).unwrap(),
            &[Constraint::AverageDensity(0.5)],
        )
        .unwrap();
        let mut buffer = Vec::new();
        assert_eq!(write_history(&field, &mut buffer).unwrap(), 0);
        assert_eq!(String::from_utf8(buffer).unwrap(), "iteration,error_0\n");
    }
}
