//! Persistence of density fields to JSON state files.

pub mod store;

pub use store::{
    PersistenceError, STATE_EXTENSION, STATE_FORMAT_VERSION, StateFile, load_state, save_state,
    state_path,
};
