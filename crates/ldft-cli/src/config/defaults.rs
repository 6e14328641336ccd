use ldft::core::field::DEFAULT_NUCLEUS_CONTRAST;
use ldft::core::lattice::BoundaryTopology;
use ldft::engine::checkpoint::CheckpointMethod;
use ldft::engine::config::ErrorNorm;
use std::path::PathBuf;

/// Values used for every setting a run file and the command line leave open.
pub struct DefaultsConfig {
    pub boundary: BoundaryTopology,
    /// Starting density of grand-canonical species.
    pub initial_density: f64,
    pub nucleus_contrast: f64,
    pub damping: f64,
    pub max_steps: usize,
    pub checkpoints: CheckpointMethod,
    /// `None` iterates for the full step budget.
    pub min_error: Option<f64>,
    pub error_norm: ErrorNorm,
    pub output_directory: PathBuf,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            boundary: BoundaryTopology::Periodic,
            initial_density: 0.5,
            nucleus_contrast: DEFAULT_NUCLEUS_CONTRAST,
            damping: 0.1,
            max_steps: 10_000,
            checkpoints: CheckpointMethod::default(),
            min_error: None,
            error_norm: ErrorNorm::default(),
            output_directory: PathBuf::from("states"),
        }
    }
}
