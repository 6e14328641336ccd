use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "ldft - Relax lattice density functional theory profiles by damped Picard iteration.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for the per-site arithmetic.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Relax a density field to self-consistency and save the result.
    Run(RunArgs),
    /// Print a summary of a saved state.
    Inspect(InspectArgs),
    /// Export the per-checkpoint error history of a saved state as CSV.
    History(HistoryArgs),
    /// List the iteration indices a checkpoint method snapshots.
    Schedule(ScheduleArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the run configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Continue from the saved state instead of seeding a new profile.
    #[arg(short, long)]
    pub resume: bool,

    // --- Solver Overrides ---
    /// Override the mixing parameter α in (0, 1].
    #[arg(short, long, value_name = "FLOAT")]
    pub damping: Option<f64>,

    /// Override the maximum number of Picard steps.
    #[arg(short = 'n', long, value_name = "INT")]
    pub max_steps: Option<usize>,

    /// Override the checkpoint method (e.g. '25', 'exp1.5', 'dec3').
    #[arg(long, value_name = "METHOD")]
    pub checkpoints: Option<String>,

    /// Override the convergence threshold on the per-species error.
    #[arg(short = 'e', long, value_name = "FLOAT")]
    pub min_error: Option<f64>,

    // --- Output Overrides ---
    /// Override the directory the state is saved to.
    #[arg(short, long, value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// Override the name the state is saved under.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S solver.damping=0.05
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Location of a saved state.
#[derive(Args, Debug, Clone)]
pub struct StateArgs {
    /// Directory holding the saved state.
    #[arg(short, long, default_value = ".", value_name = "PATH")]
    pub dir: PathBuf,

    /// Name of the saved state (the '.json' extension is optional).
    #[arg(required = true, value_name = "NAME")]
    pub name: String,
}

/// Free-energy models selectable from the command line and run files.
#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ModelArg {
    Ideal,
    IdealExclusion,
    MeanField,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Evaluate the free energy and grand potentials with this model.
    #[arg(short, long, value_enum, value_name = "MODEL")]
    pub model: Option<ModelArg>,

    /// Nearest-neighbour attraction of the mean-field model.
    #[arg(long, value_name = "FLOAT", required_if_eq("model", "mean-field"))]
    pub epsilon: Option<f64>,
}

/// Arguments for the `history` subcommand.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Write the CSV to this file instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `schedule` subcommand.
#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Checkpoint method (e.g. '25', 'exp1.5', 'dec3').
    #[arg(required = true, value_name = "METHOD")]
    pub method: String,

    /// Iteration counter the schedule starts from.
    #[arg(short, long, default_value_t = 0, value_name = "INT")]
    pub start: usize,

    /// Number of checkpoints to list.
    #[arg(short, long, default_value_t = 10, value_name = "INT")]
    pub count: usize,
}
