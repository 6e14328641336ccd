//! # Lattice Module
//!
//! Lattice extent, boundary topology, and the boundary-aware shift that every
//! finite-range functional uses to reach neighbouring sites.
//!
//! - [`geometry`] - [`LatticeGeometry`] and [`BoundaryTopology`] value types
//! - [`shift`] - periodic and tilted circular shifts of lattice arrays
//!
//! Tilted topologies identify the faces of a `(L, .., L, 2L)` box with a
//! displacement of `L` along the long axis. The periodic images of the box
//! then repeat along the diagonals, which is the discrete equivalent of a
//! 45 degree rotated simulation cell.

pub mod geometry;
pub mod shift;

pub use geometry::{BoundaryTopology, GeometryError, LatticeGeometry, ShiftPlan};
pub use shift::{roll, tilted_roll};
