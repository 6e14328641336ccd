use super::density::DensityField;
use super::error::FieldError;
use crate::core::lattice::{BoundaryTopology, LatticeGeometry, roll};
use ndarray::{ArrayD, Axis, Slice};
use serde::{Deserialize, Serialize};

/// Default density offset of a nucleus relative to its surroundings.
pub const DEFAULT_NUCLEUS_CONTRAST: f64 = 0.05;

/// A centered, axis-aligned block of raised (or lowered) density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nucleus {
    /// Extent of the block along every lattice axis.
    pub shape: Vec<usize>,
    /// Density offset of the block; applied upwards below half filling and
    /// downwards otherwise.
    #[serde(default = "default_contrast")]
    pub contrast: f64,
}

fn default_contrast() -> f64 {
    DEFAULT_NUCLEUS_CONTRAST
}

impl Nucleus {
    pub fn new(shape: impl Into<Vec<usize>>) -> Self {
        Self {
            shape: shape.into(),
            contrast: DEFAULT_NUCLEUS_CONTRAST,
        }
    }

    pub fn with_contrast(mut self, contrast: f64) -> Self {
        self.contrast = contrast;
        self
    }

    fn validate(&self, geometry: &LatticeGeometry, species: usize, density: f64) -> Result<(), FieldError> {
        if self.shape.len() != geometry.dim() {
            return Err(FieldError::InvalidNucleus {
                species,
                reason: format!(
                    "shape {:?} has {} axes, lattice has {}",
                    self.shape,
                    self.shape.len(),
                    geometry.dim()
                ),
            });
        }
        if let Some(axis) = (0..self.shape.len()).find(|&a| self.shape[a] > geometry.size()[a]) {
            return Err(FieldError::InvalidNucleus {
                species,
                reason: format!(
                    "extent {} along axis {axis} exceeds the lattice size {}",
                    self.shape[axis],
                    geometry.size()[axis]
                ),
            });
        }
        let inside = self.block_density(density);
        if !(self.contrast.is_finite() && inside > 0.0 && inside < 1.0) {
            return Err(FieldError::InvalidNucleus {
                species,
                reason: format!("contrast {} gives a block density of {inside}", self.contrast),
            });
        }
        Ok(())
    }

    fn block_density(&self, density: f64) -> f64 {
        if density < 0.5 {
            density + self.contrast
        } else {
            density - self.contrast
        }
    }
}

/// A uniform profile at `density` on every site of the lattice.
pub fn homogeneous_profile(geometry: &LatticeGeometry, density: f64) -> ArrayD<f64> {
    ArrayD::from_elem(geometry.shape(), density)
}

/// A profile with average `density` containing a centered nucleus.
///
/// On tilted lattices the block is sheared so that it is continuous across
/// the displaced boundary: every slab along a tilted axis is rolled along the
/// long axis by `L - i`. The profile is finally rescaled so that its mean is
/// exactly `density`.
///
/// # Errors
///
/// Returns [`FieldError`] if the density is outside (0, 1) or the nucleus does
/// not fit the lattice.
pub fn nucleated_profile(
    geometry: &LatticeGeometry,
    density: f64,
    nucleus: &Nucleus,
) -> Result<ArrayD<f64>, FieldError> {
    nucleated_profile_for(geometry, 0, density, nucleus)
}

fn nucleated_profile_for(
    geometry: &LatticeGeometry,
    species: usize,
    density: f64,
    nucleus: &Nucleus,
) -> Result<ArrayD<f64>, FieldError> {
    check_density(species, density)?;
    nucleus.validate(geometry, species, density)?;

    let mut profile = homogeneous_profile(geometry, density);
    {
        let mut block = profile.view_mut();
        for (axis, (&len, &extent)) in geometry.size().iter().zip(&nucleus.shape).enumerate() {
            let start = (len - extent) / 2;
            let end = (len + extent) / 2;
            block.slice_axis_inplace(Axis(axis), Slice::from(start..end));
        }
        block.fill(nucleus.block_density(density));
    }

    let long = geometry.long_axis();
    let sheared_axes: &[usize] = match geometry.topology() {
        BoundaryTopology::Periodic => &[],
        BoundaryTopology::Tilted11 => &[0],
        BoundaryTopology::Tilted110 => &[1],
        BoundaryTopology::Tilted111 => &[1, 0],
    };
    let shear = geometry.size()[0] as isize;
    for &axis in sheared_axes {
        // The slab drops `axis`, so the long axis index shifts down by one.
        let slab_long = long - 1;
        for i in 0..geometry.size()[axis] {
            let slab = profile.index_axis(Axis(axis), i);
            let rolled = roll(&slab, shear - i as isize, slab_long);
            profile.index_axis_mut(Axis(axis), i).assign(&rolled);
        }
    }

    let mean = profile.mean().unwrap_or(density);
    if mean > 0.0 {
        profile *= density / mean;
    }
    Ok(profile)
}

fn check_density(species: usize, density: f64) -> Result<(), FieldError> {
    if !(density > 0.0 && density < 1.0) {
        return Err(FieldError::InvalidDensity {
            species,
            value: density,
        });
    }
    Ok(())
}

impl DensityField {
    /// Builds one initial profile per species and installs it.
    ///
    /// A species without a nucleus receives a homogeneous profile. Like
    /// [`set_field`](Self::set_field), this resets the counter and clears the
    /// history.
    ///
    /// # Arguments
    ///
    /// * `densities` - Average density of every species.
    /// * `nuclei` - Optional nucleus of every species.
    pub fn create_init_profile(
        &mut self,
        densities: &[f64],
        nuclei: &[Option<Nucleus>],
    ) -> Result<(), FieldError> {
        let count = self.species_count();
        for found in [densities.len(), nuclei.len()] {
            if found != count {
                return Err(FieldError::SpeciesCount {
                    expected: count,
                    found,
                });
            }
        }
        let profile = densities
            .iter()
            .zip(nuclei)
            .enumerate()
            .map(|(species, (&density, nucleus))| match nucleus {
                Some(nucleus) => nucleated_profile_for(self.geometry(), species, density, nucleus),
                None => {
                    check_density(species, density)?;
                    Ok(homogeneous_profile(self.geometry(), density))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.set_field(profile)
    }
}
