//! # Engine Module
//!
//! The stateful layer that drives a density field towards the minimum of a
//! lattice functional by damped Picard iteration.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Damping, step budget, convergence threshold,
//!   error norm and divergence guard, assembled through a validating builder
//! - **Checkpoints** ([`checkpoint`]) - Schedules deciding when the field is
//!   snapshotted into its history
//! - **Solver** ([`picard`]) - The Picard step and the checkpointed run loop
//! - **Run State** ([`state`]) - Terminal outcomes and run reports
//! - **Diagnostics** ([`diagnostics`]) - Free energy and (semi-)grand potentials
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-level error taxonomy
//!
//! The solver is strictly sequential across steps. With the `parallel` feature
//! the per-site arithmetic inside a step runs on the rayon thread pool.

pub mod checkpoint;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod picard;
pub mod progress;
pub mod state;
