//! # LDFT Core Library
//!
//! Lattice density functional theory: relaxes multi-species density profiles
//! on 2D and 3D lattices to the minimum of a free-energy functional by damped
//! Picard iteration, with periodic and tilted ((11), (110), (111)) boundaries.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Lattice geometry and the boundary shift
//!   operator, the multi-species `DensityField` with its checkpoint history,
//!   the `Functional` contract with reference lattice-gas models, and JSON
//!   persistence.
//!
//! - **[`engine`]: The Logic Core.** The Picard solver, its configuration and
//!   checkpoint schedules, run outcomes, thermodynamic diagnostics and
//!   progress reporting.
//!
//! - **[`workflows`]: The Public API.** Complete procedures such as relaxing a
//!   field from an initial profile and saving the result.

pub mod core;
pub mod engine;
pub mod workflows;
