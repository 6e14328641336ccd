use ndarray::IxDyn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while constructing a lattice or validating arrays against it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Unsupported lattice dimensionality {dim}: only 2D and 3D lattices are supported")]
    UnsupportedDimension { dim: usize },

    #[error("Lattice axis {axis} has zero length")]
    EmptyAxis { axis: usize },

    #[error("Boundary topology '{topology}' requires a {required}D lattice, got {dim}D")]
    TopologyDimension {
        topology: BoundaryTopology,
        required: usize,
        dim: usize,
    },

    #[error(
        "Boundary topology '{topology}' requires a size of the form (L, .., L, 2L), got {size:?}"
    )]
    TiltedShape {
        topology: BoundaryTopology,
        size: Vec<usize>,
    },

    #[error("Axis {axis} is out of range for a {dim}D lattice")]
    AxisOutOfRange { axis: usize, dim: usize },

    #[error("Array shape {found:?} does not match lattice size {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Unknown boundary topology '{0}'")]
    UnknownTopology(String),
}

/// The way opposite faces of the simulation box are identified.
///
/// The tilted variants realize a sheared periodic identification: leaving the
/// box through a tilted face re-enters the opposite face displaced by half of
/// the long axis. This hosts planar interfaces with (11), (110) and (111)
/// orientation without rotating the lattice itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryTopology {
    /// Plain torus: every axis wraps onto itself.
    #[default]
    Periodic,
    /// 2D box `(L, 2L)`; crossing axis 0 shifts along axis 1.
    #[serde(rename = "tilted-11", alias = "11_if")]
    Tilted11,
    /// 3D box `(L, L, 2L)`; crossing axis 1 shifts along axis 2.
    #[serde(rename = "tilted-110", alias = "110_if")]
    Tilted110,
    /// 3D box `(L, L, 2L)`; crossing axis 0 or 1 shifts along axis 2.
    #[serde(rename = "tilted-111", alias = "111_if")]
    Tilted111,
}

impl BoundaryTopology {
    /// The dimensionality a topology is defined for, `None` if any is accepted.
    pub fn required_dimension(self) -> Option<usize> {
        match self {
            Self::Periodic => None,
            Self::Tilted11 => Some(2),
            Self::Tilted110 | Self::Tilted111 => Some(3),
        }
    }

    pub fn is_tilted(self) -> bool {
        !matches!(self, Self::Periodic)
    }
}

impl fmt::Display for BoundaryTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Periodic => "periodic",
            Self::Tilted11 => "tilted-11",
            Self::Tilted110 => "tilted-110",
            Self::Tilted111 => "tilted-111",
        };
        f.write_str(name)
    }
}

impl FromStr for BoundaryTopology {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "periodic" => Ok(Self::Periodic),
            "tilted-11" | "11_if" | "11" => Ok(Self::Tilted11),
            "tilted-110" | "110_if" | "110" => Ok(Self::Tilted110),
            "tilted-111" | "111_if" | "111" => Ok(Self::Tilted111),
            _ => Err(GeometryError::UnknownTopology(s.to_string())),
        }
    }
}

/// How a shift along one axis treats the slab that crosses the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftPlan {
    /// Standard circular shift.
    Periodic,
    /// Circular shift whose wrapped slab is displaced by `shift` sites along
    /// `shift_axis` per boundary crossing.
    Tilted { shift_axis: usize, shift: isize },
}

/// Immutable description of the lattice extent and its boundary topology.
///
/// A geometry is validated once at construction and never mutated afterwards.
/// Deserialization goes through the same validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawGeometry", into = "RawGeometry")]
pub struct LatticeGeometry {
    size: Vec<usize>,
    topology: BoundaryTopology,
}

#[derive(Serialize, Deserialize)]
struct RawGeometry {
    size: Vec<usize>,
    #[serde(default)]
    topology: BoundaryTopology,
}

impl TryFrom<RawGeometry> for LatticeGeometry {
    type Error = GeometryError;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        Self::new(raw.size, raw.topology)
    }
}

impl From<LatticeGeometry> for RawGeometry {
    fn from(geometry: LatticeGeometry) -> Self {
        Self {
            size: geometry.size,
            topology: geometry.topology,
        }
    }
}

impl LatticeGeometry {
    /// Creates a validated lattice geometry.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of lattice sites along each axis (2 or 3 axes).
    /// * `topology` - Boundary identification of the box faces.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the dimensionality is unsupported, an axis
    /// is empty, the topology does not fit the dimensionality, or a tilted
    /// topology is requested for a box that is not of the form `(L, .., L, 2L)`.
    pub fn new(size: impl Into<Vec<usize>>, topology: BoundaryTopology) -> Result<Self, GeometryError> {
        let size = size.into();
        let dim = size.len();
        if !(2..=3).contains(&dim) {
            return Err(GeometryError::UnsupportedDimension { dim });
        }
        if let Some(axis) = size.iter().position(|&len| len == 0) {
            return Err(GeometryError::EmptyAxis { axis });
        }
        if let Some(required) = topology.required_dimension() {
            if required != dim {
                return Err(GeometryError::TopologyDimension {
                    topology,
                    required,
                    dim,
                });
            }
            let short = size[0];
            let cross_section_ok = size[..dim - 1].iter().all(|&len| len == short);
            if !cross_section_ok || size[dim - 1] != 2 * short {
                return Err(GeometryError::TiltedShape { topology, size });
            }
        }
        Ok(Self { size, topology })
    }

    /// Shorthand for a periodic lattice.
    pub fn periodic(size: impl Into<Vec<usize>>) -> Result<Self, GeometryError> {
        Self::new(size, BoundaryTopology::Periodic)
    }

    /// Number of lattice sites along each axis.
    pub fn size(&self) -> &[usize] {
        &self.size
    }

    /// Dimensionality of the lattice (2 or 3).
    pub fn dim(&self) -> usize {
        self.size.len()
    }

    pub fn topology(&self) -> BoundaryTopology {
        self.topology
    }

    /// Total number of lattice sites.
    pub fn site_count(&self) -> usize {
        self.size.iter().product()
    }

    /// The `ndarray` shape matching this lattice.
    pub fn shape(&self) -> IxDyn {
        IxDyn(&self.size)
    }

    /// The axis along which the box is twice as long in tilted topologies.
    ///
    /// This is always the last axis; for periodic boxes it carries no
    /// special meaning.
    pub fn long_axis(&self) -> usize {
        self.dim() - 1
    }

    /// Checks that `axis` addresses a lattice axis.
    pub fn check_axis(&self, axis: usize) -> Result<(), GeometryError> {
        if axis >= self.dim() {
            return Err(GeometryError::AxisOutOfRange {
                axis,
                dim: self.dim(),
            });
        }
        Ok(())
    }

    /// Checks that an array shape matches the lattice size exactly.
    pub fn check_shape(&self, shape: &[usize]) -> Result<(), GeometryError> {
        if shape != self.size.as_slice() {
            return Err(GeometryError::ShapeMismatch {
                expected: self.size.clone(),
                found: shape.to_vec(),
            });
        }
        Ok(())
    }

    /// Resolves how a shift along `axis` must treat the boundary.
    ///
    /// Tilted boxes displace the wrapped slab along the long axis by half of
    /// its length. Shifts along the long axis itself are always periodic, and
    /// for (110) boxes axis 0 is periodic as well.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::AxisOutOfRange`] for an invalid axis.
    pub fn shift_plan(&self, axis: usize) -> Result<ShiftPlan, GeometryError> {
        self.check_axis(axis)?;
        let long_axis = self.long_axis();
        let tilted = ShiftPlan::Tilted {
            shift_axis: long_axis,
            shift: (self.size[long_axis] / 2) as isize,
        };
        let plan = match self.topology {
            BoundaryTopology::Periodic => ShiftPlan::Periodic,
            _ if axis == long_axis => ShiftPlan::Periodic,
            BoundaryTopology::Tilted11 | BoundaryTopology::Tilted111 => tilted,
            BoundaryTopology::Tilted110 if axis == (long_axis + 1) % 3 => ShiftPlan::Periodic,
            BoundaryTopology::Tilted110 => tilted,
        };
        Ok(plan)
    }
}

impl fmt::Display for LatticeGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extents: Vec<String> = self.size.iter().map(ToString::to_string).collect();
        write!(f, "{} ({})", extents.join("x"), self.topology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periodic_geometry_accepts_any_2d_or_3d_size() {
        let g2 = LatticeGeometry::periodic(vec![3, 7]).unwrap();
        assert_eq!(g2.dim(), 2);
        assert_eq!(g2.site_count(), 21);
        let g3 = LatticeGeometry::periodic(vec![2, 3, 4]).unwrap();
        assert_eq!(g3.dim(), 3);
        assert_eq!(g3.topology(), BoundaryTopology::Periodic);
    }

    #[test]
    fn unsupported_dimension_is_rejected() {
        assert_eq!(
            LatticeGeometry::periodic(vec![4]),
            Err(GeometryError::UnsupportedDimension { dim: 1 })
        );
        assert_eq!(
            LatticeGeometry::periodic(vec![2, 2, 2, 2]),
            Err(GeometryError::UnsupportedDimension { dim: 4 })
        );
    }

    #[test]
    fn empty_axis_is_rejected() {
        assert_eq!(
            LatticeGeometry::periodic(vec![4, 0]),
            Err(GeometryError::EmptyAxis { axis: 1 })
        );
    }

    #[test]
    fn tilted_topology_requires_long_last_axis() {
        assert!(LatticeGeometry::new(vec![4, 8], BoundaryTopology::Tilted11).is_ok());
        assert!(matches!(
            LatticeGeometry::new(vec![4, 4], BoundaryTopology::Tilted11),
            Err(GeometryError::TiltedShape { .. })
        ));
        assert!(matches!(
            LatticeGeometry::new(vec![8, 4], BoundaryTopology::Tilted11),
            Err(GeometryError::TiltedShape { .. })
        ));
        assert!(LatticeGeometry::new(vec![3, 3, 6], BoundaryTopology::Tilted111).is_ok());
        assert!(matches!(
            LatticeGeometry::new(vec![3, 4, 6], BoundaryTopology::Tilted110),
            Err(GeometryError::TiltedShape { .. })
        ));
    }

    #[test]
    fn tilted_topology_requires_matching_dimension() {
        assert!(matches!(
            LatticeGeometry::new(vec![2, 2, 4], BoundaryTopology::Tilted11),
            Err(GeometryError::TopologyDimension { required: 2, .. })
        ));
        assert!(matches!(
            LatticeGeometry::new(vec![2, 4], BoundaryTopology::Tilted110),
            Err(GeometryError::TopologyDimension { required: 3, .. })
        ));
    }

    #[test]
    fn shift_plan_follows_topology() {
        let g11 = LatticeGeometry::new(vec![4, 8], BoundaryTopology::Tilted11).unwrap();
        assert_eq!(
            g11.shift_plan(0).unwrap(),
            ShiftPlan::Tilted {
                shift_axis: 1,
                shift: 4
            }
        );
        assert_eq!(g11.shift_plan(1).unwrap(), ShiftPlan::Periodic);

        let g110 = LatticeGeometry::new(vec![3, 3, 6], BoundaryTopology::Tilted110).unwrap();
        assert_eq!(g110.shift_plan(0).unwrap(), ShiftPlan::Periodic);
        assert_eq!(
            g110.shift_plan(1).unwrap(),
            ShiftPlan::Tilted {
                shift_axis: 2,
                shift: 3
            }
        );
        assert_eq!(g110.shift_plan(2).unwrap(), ShiftPlan::Periodic);

        let g111 = LatticeGeometry::new(vec![3, 3, 6], BoundaryTopology::Tilted111).unwrap();
        assert!(matches!(g111.shift_plan(0).unwrap(), ShiftPlan::Tilted { .. }));
        assert!(matches!(g111.shift_plan(1).unwrap(), ShiftPlan::Tilted { .. }));
        assert_eq!(g111.shift_plan(2).unwrap(), ShiftPlan::Periodic);
    }

    #[test]
    fn shift_plan_rejects_out_of_range_axis() {
        let g = LatticeGeometry::periodic(vec![2, 2]).unwrap();
        assert_eq!(
            g.shift_plan(2),
            Err(GeometryError::AxisOutOfRange { axis: 2, dim: 2 })
        );
    }

    #[test]
    fn check_shape_reports_mismatch() {
        let g = LatticeGeometry::periodic(vec![2, 3]).unwrap();
        assert!(g.check_shape(&[2, 3]).is_ok());
        assert_eq!(
            g.check_shape(&[3, 2]),
            Err(GeometryError::ShapeMismatch {
                expected: vec![2, 3],
                found: vec![3, 2]
            })
        );
    }

    #[test]
    fn topology_parses_legacy_and_kebab_names() {
        assert_eq!("11_if".parse::<BoundaryTopology>().unwrap(), BoundaryTopology::Tilted11);
        assert_eq!(
            "tilted-111".parse::<BoundaryTopology>().unwrap(),
            BoundaryTopology::Tilted111
        );
        assert_eq!("Periodic".parse::<BoundaryTopology>().unwrap(), BoundaryTopology::Periodic);
        assert!("hexagonal".parse::<BoundaryTopology>().is_err());
    }

    #[test]
    fn deserialization_revalidates_geometry() {
        let ok: LatticeGeometry =
            serde_json::from_str(r#"{"size":[2,4],"topology":"tilted-11"}"#).unwrap();
        assert_eq!(ok.topology(), BoundaryTopology::Tilted11);
        let bad = serde_json::from_str::<LatticeGeometry>(r#"{"size":[2,2],"topology":"tilted-11"}"#);
        assert!(bad.is_err());
    }
}
