use crate::core::field::{DensityField, FieldError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Version tag written into every state file.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// File extension of persisted states.
pub const STATE_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed state file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported state format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Stored state is inconsistent: {0}")]
    Invalid(#[from] FieldError),

    #[error("Invalid state name '{0}': a name must be a single non-empty path component")]
    InvalidName(String),
}

#[derive(Serialize)]
struct StateRecordRef<'a> {
    version: u32,
    field: &'a DensityField,
}

#[derive(Deserialize)]
struct StateRecord {
    version: u32,
    field: DensityField,
}

/// JSON encoding of a complete [`DensityField`]: geometry, constraints,
/// external potentials, current profile, history and iteration counter.
pub struct StateFile;

impl StateFile {
    /// Reads a field from a buffered reader and re-validates it.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the input is not a state record of a
    /// supported version or its content violates a field invariant.
    pub fn read_from(reader: &mut impl BufRead) -> Result<DensityField, PersistenceError> {
        let record: StateRecord = serde_json::from_reader(reader)?;
        if record.version != STATE_FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: record.version,
                supported: STATE_FORMAT_VERSION,
            });
        }
        record.field.validate()?;
        Ok(record.field)
    }

    pub fn write_to(field: &DensityField, writer: &mut impl Write) -> Result<(), PersistenceError> {
        let record = StateRecordRef {
            version: STATE_FORMAT_VERSION,
            field,
        };
        serde_json::to_writer(&mut *writer, &record)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<DensityField, PersistenceError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    pub fn write_to_path<P: AsRef<Path>>(field: &DensityField, path: P) -> Result<(), PersistenceError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(field, &mut writer)
    }
}

/// The file a state called `name` occupies inside `directory`.
///
/// The `.json` extension is appended unless `name` already carries it.
pub fn state_path(directory: &Path, name: &str) -> Result<PathBuf, PersistenceError> {
    let trimmed = name.trim();
    let is_component = !trimmed.is_empty()
        && Path::new(trimmed).components().count() == 1
        && Path::new(trimmed).file_name().is_some();
    if !is_component {
        return Err(PersistenceError::InvalidName(name.to_string()));
    }
    let file_name: Cow<'_, str> = if Path::new(trimmed)
        .extension()
        .is_some_and(|ext| ext == STATE_EXTENSION)
    {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(format!("{trimmed}.{STATE_EXTENSION}"))
    };
    Ok(directory.join(file_name.as_ref()))
}

/// Saves `field` as `name` inside `directory`, creating the directory if needed.
///
/// Returns the path of the written file.
pub fn save_state(
    field: &DensityField,
    directory: impl AsRef<Path>,
    name: &str,
) -> Result<PathBuf, PersistenceError> {
    let directory = directory.as_ref();
    let path = state_path(directory, name)?;
    if !directory.as_os_str().is_empty() {
        fs::create_dir_all(directory)?;
    }
    StateFile::write_to_path(field, &path)?;
    info!(
        path = %path.display(),
        iteration = field.iteration(),
        checkpoints = field.history().len(),
        "Saved density field."
    );
    Ok(path)
}

/// Loads the state called `name` from `directory`.
pub fn load_state(directory: impl AsRef<Path>, name: &str) -> Result<DensityField, PersistenceError> {
    let path = state_path(directory.as_ref(), name)?;
    debug!(path = %path.display(), "Loading density field.");
    StateFile::read_from_path(&path)
}
