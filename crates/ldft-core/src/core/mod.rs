//! # Core Module
//!
//! Stateless building blocks of a lattice density functional calculation.
//!
//! - **Lattice** ([`lattice`]) - Box extents, boundary topologies and the shift
//!   operator that realizes periodic and tilted boundaries.
//! - **Field** ([`field`]) - The multi-species density state with its
//!   thermodynamic constraints, checkpoint history and initial profiles.
//! - **Functionals** ([`functional`]) - The free-energy contract consumed by
//!   the solver, with an ideal and a mean-field reference lattice gas.
//! - **I/O** ([`io`]) - JSON persistence of complete density fields.

pub mod field;
pub mod functional;
pub mod io;
pub mod lattice;
