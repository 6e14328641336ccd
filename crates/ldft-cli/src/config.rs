pub mod defaults;
pub mod models;

use crate::cli::{ModelArg, RunArgs};
use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use ldft::core::field::{Constraint, Nucleus};
use ldft::core::lattice::{BoundaryTopology, LatticeGeometry};
use ldft::engine::checkpoint::CheckpointMethod;
use ldft::engine::config::{DivergenceGuard, ErrorNorm, SolverConfig};
use ldft::workflows::relax::{InitialCondition, OutputTarget, RelaxConfig};
use models::{ModelKind, RunPlan};
use serde::Deserialize;
use serde::de::IntoDeserializer;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialLatticeConfig {
    size: Option<Vec<usize>>,
    boundary: Option<BoundaryTopology>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSpeciesConfig {
    chemical_potential: Option<f64>,
    average_density: Option<f64>,
    initial_density: Option<f64>,
    nucleus: Option<Vec<usize>>,
    contrast: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialModelConfig {
    #[serde(rename = "type")]
    kind: Option<ModelArg>,
    epsilon: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSolverConfig {
    damping: Option<f64>,
    max_steps: Option<usize>,
    checkpoints: Option<String>,
    min_error: Option<f64>,
    error_norm: Option<String>,
    max_error_growth: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    directory: Option<PathBuf>,
    name: Option<String>,
}

/// A TOML run file as written by the user, every section optional until merged.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    lattice: Option<PartialLatticeConfig>,
    #[serde(default)]
    species: Vec<PartialSpeciesConfig>,
    model: Option<PartialModelConfig>,
    solver: Option<PartialSolverConfig>,
    output: Option<PartialOutputConfig>,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading run configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Resolves the run file against `-S` overrides, explicit flags and the
    /// built-in defaults, in that order of precedence (flags win).
    pub fn merge_with_cli(mut self, args: &RunArgs) -> Result<RunPlan> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();

        let lattice = self.lattice.take().unwrap_or_default();
        let size = lattice
            .size
            .ok_or_else(|| CliError::Config("`lattice.size` is required.".to_string()))?;
        let geometry = LatticeGeometry::new(size, lattice.boundary.unwrap_or(defaults.boundary))
            .map_err(|e| CliError::Config(e.to_string()))?;

        if self.species.is_empty() {
            return Err(CliError::Config(
                "At least one `[[species]]` entry is required.".to_string(),
            ));
        }
        let mut constraints = Vec::with_capacity(self.species.len());
        let mut densities = Vec::with_capacity(self.species.len());
        let mut nuclei = Vec::with_capacity(self.species.len());
        for (index, species) in self.species.iter().enumerate() {
            let (constraint, density, nucleus) = Self::merge_species(index, species, &defaults)?;
            constraints.push(constraint);
            densities.push(density);
            nuclei.push(nucleus);
        }

        let model = self.model.take().unwrap_or_default();
        let model = ModelKind::resolve(model.kind.unwrap_or(ModelArg::Ideal), model.epsilon)?;

        let solver = Self::merge_solver(args, self.solver.take().unwrap_or_default(), &defaults)?;

        let output = self.output.take().unwrap_or_default();
        let name = args
            .name
            .clone()
            .or(output.name)
            .or_else(|| {
                args.config
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .ok_or_else(|| CliError::Config("`output.name` is required.".to_string()))?;
        let directory = args
            .output_dir
            .clone()
            .or(output.directory)
            .unwrap_or(defaults.output_directory);

        let initial = if args.resume {
            InitialCondition::Resume
        } else {
            InitialCondition::Profile { densities, nuclei }
        };

        Ok(RunPlan {
            geometry,
            constraints,
            model,
            relax: RelaxConfig {
                solver,
                initial,
                output: Some(OutputTarget { directory, name }),
            },
        })
    }

    fn merge_species(
        index: usize,
        partial: &PartialSpeciesConfig,
        defaults: &DefaultsConfig,
    ) -> Result<(Constraint, f64, Option<Nucleus>)> {
        let constraint = match (partial.chemical_potential, partial.average_density) {
            (Some(mu), None) => Constraint::ChemicalPotential(mu),
            (None, Some(rho)) => Constraint::AverageDensity(rho),
            _ => {
                return Err(CliError::Config(format!(
                    "Species {index} needs exactly one of `chemical-potential` and `average-density`."
                )));
            }
        };
        let density = partial
            .initial_density
            .or(partial.average_density)
            .unwrap_or(defaults.initial_density);
        let nucleus = match (&partial.nucleus, partial.contrast) {
            (Some(shape), contrast) => Some(
                Nucleus::new(shape.clone())
                    .with_contrast(contrast.unwrap_or(defaults.nucleus_contrast)),
            ),
            (None, Some(_)) => {
                return Err(CliError::Config(format!(
                    "Species {index} sets `contrast` without a `nucleus`."
                )));
            }
            (None, None) => None,
        };
        Ok((constraint, density, nucleus))
    }

    fn merge_solver(
        args: &RunArgs,
        partial: PartialSolverConfig,
        defaults: &DefaultsConfig,
    ) -> Result<SolverConfig> {
        let checkpoints = match args.checkpoints.as_deref().or(partial.checkpoints.as_deref()) {
            Some(method) => parse_value::<CheckpointMethod>("solver.checkpoints", method)?,
            None => defaults.checkpoints,
        };
        let error_norm = match partial.error_norm.as_deref() {
            Some(norm) => parse_value::<ErrorNorm>("solver.error-norm", norm)?,
            None => defaults.error_norm,
        };

        let mut builder = SolverConfig::builder()
            .damping(args.damping.or(partial.damping).unwrap_or(defaults.damping))
            .max_steps(args.max_steps.or(partial.max_steps).unwrap_or(defaults.max_steps))
            .checkpoints(checkpoints)
            .error_norm(error_norm);
        if let Some(threshold) = args.min_error.or(partial.min_error).or(defaults.min_error) {
            builder = builder.min_error(threshold);
        }
        if let Some(factor) = partial.max_error_growth {
            builder = builder.divergence(DivergenceGuard::with_max_growth(factor));
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "lattice.boundary" => {
                    self.lattice.get_or_insert_with(Default::default).boundary =
                        Some(parse_enum(key, value)?);
                }
                "model.type" => {
                    self.model.get_or_insert_with(Default::default).kind =
                        Some(parse_enum(key, value)?);
                }
                "model.epsilon" => {
                    self.model.get_or_insert_with(Default::default).epsilon =
                        Some(parse_value(key, value)?);
                }
                "solver.damping" => {
                    self.solver.get_or_insert_with(Default::default).damping =
                        Some(parse_value(key, value)?);
                }
                "solver.max-steps" => {
                    self.solver.get_or_insert_with(Default::default).max_steps =
                        Some(parse_value(key, value)?);
                }
                "solver.checkpoints" => {
                    self.solver.get_or_insert_with(Default::default).checkpoints =
                        Some(value.to_string());
                }
                "solver.min-error" => {
                    self.solver.get_or_insert_with(Default::default).min_error =
                        Some(parse_value(key, value)?);
                }
                "solver.error-norm" => {
                    self.solver.get_or_insert_with(Default::default).error_norm =
                        Some(value.to_string());
                }
                "solver.max-error-growth" => {
                    self.solver
                        .get_or_insert_with(Default::default)
                        .max_error_growth = Some(parse_value(key, value)?);
                }
                "output.directory" => {
                    self.output.get_or_insert_with(Default::default).directory =
                        Some(PathBuf::from(value));
                }
                "output.name" => {
                    self.output.get_or_insert_with(Default::default).name = Some(value.to_string());
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| CliError::Config(format!("Invalid value for {}: '{}' ({})", key, value, e)))
}

/// Parses a kebab-case enum name the same way the run file does.
fn parse_enum<'de, T: Deserialize<'de>>(key: &str, value: &'de str) -> Result<T> {
    let deserializer: serde::de::value::StrDeserializer<'de, serde::de::value::Error> =
        value.into_deserializer();
    T::deserialize(deserializer)
        .map_err(|e| CliError::Config(format!("Invalid value for {}: '{}' ({})", key, value, e)))
}
