//! # Workflows Module
//!
//! High-level entry points that tie the [`core`](crate::core) and
//! [`engine`](crate::engine) layers together into complete procedures.
//!
//! - **Relaxation Workflow** ([`relax`]) - Prepares an initial profile (or
//!   resumes a stored one), iterates it to self-consistency, evaluates the
//!   thermodynamic potentials and persists the relaxed field.

pub mod relax;
