use super::error::FieldError;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

/// A snapshot of the density field taken at one Picard iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Iteration counter at the time of the snapshot.
    pub iteration: usize,
    /// Copy of every species' density profile.
    pub densities: Vec<ArrayD<f64>>,
    /// Picard error of every species in the step that produced this field.
    pub errors: Vec<f64>,
}

/// Append-only record of checkpoints with strictly increasing iteration indices.
///
/// Field snapshots and errors are stored together, so the two sequences are
/// index-aligned by construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    checkpoints: Vec<Checkpoint>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from parallel sequences, validating their alignment.
    ///
    /// # Arguments
    ///
    /// * `fields` - Snapshot of every species' profile per entry.
    /// * `indices` - Iteration index per entry, strictly increasing.
    /// * `errors` - Per-species error per entry.
    /// * `species_count` - Number of species each entry must describe.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError`] if the sequences differ in length, are empty,
    /// are not strictly increasing, or describe the wrong number of species.
    pub fn from_parts(
        fields: Vec<Vec<ArrayD<f64>>>,
        indices: Vec<usize>,
        errors: Vec<Vec<f64>>,
        species_count: usize,
    ) -> Result<Self, FieldError> {
        if fields.len() != indices.len() || fields.len() != errors.len() {
            return Err(FieldError::HistoryLength {
                fields: fields.len(),
                indices: indices.len(),
                errors: errors.len(),
            });
        }
        if fields.is_empty() {
            return Err(FieldError::EmptyHistory);
        }
        for (position, pair) in indices.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(FieldError::NonMonotonicHistory {
                    position: position + 1,
                    previous: pair[0],
                    found: pair[1],
                });
            }
        }
        for (position, (field, error)) in fields.iter().zip(&errors).enumerate() {
            if field.len() != species_count {
                return Err(FieldError::SpeciesCount {
                    expected: species_count,
                    found: field.len(),
                });
            }
            if error.len() != species_count {
                return Err(FieldError::ErrorWidth {
                    position,
                    expected: species_count,
                    found: error.len(),
                });
            }
        }

        let checkpoints = fields
            .into_iter()
            .zip(indices)
            .zip(errors)
            .map(|((densities, iteration), errors)| Checkpoint {
                iteration,
                densities,
                errors,
            })
            .collect();
        Ok(Self { checkpoints })
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn last(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    pub fn last_iteration(&self) -> Option<usize> {
        self.last().map(|cp| cp.iteration)
    }

    /// Iteration indices of all checkpoints, in order.
    pub fn iterations(&self) -> Vec<usize> {
        self.checkpoints.iter().map(|cp| cp.iteration).collect()
    }

    /// Per-species errors of all checkpoints, in order.
    pub fn errors(&self) -> Vec<&[f64]> {
        self.checkpoints.iter().map(|cp| cp.errors.as_slice()).collect()
    }

    /// Density snapshots of all checkpoints, in order.
    pub fn fields(&self) -> Vec<&[ArrayD<f64>]> {
        self.checkpoints
            .iter()
            .map(|cp| cp.densities.as_slice())
            .collect()
    }

    pub(crate) fn push(&mut self, checkpoint: Checkpoint) {
        debug_assert!(
            self.last_iteration()
                .is_none_or(|last| checkpoint.iteration > last),
            "history indices must be strictly increasing"
        );
        self.checkpoints.push(checkpoint);
    }

    pub(crate) fn clear(&mut self) {
        self.checkpoints.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn field(value: f64) -> Vec<ArrayD<f64>> {
        vec![ArrayD::from_elem(IxDyn(&[2, 2]), value)]
    }

    #[test]
    fn from_parts_builds_aligned_history() {
        let history = History::from_parts(
            vec![field(0.1), field(0.2)],
            vec![0, 10],
            vec![vec![1.0], vec![0.5]],
            1,
        )
        .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.iterations(), vec![0, 10]);
        assert_eq!(history.errors()[1], &[0.5]);
        assert_eq!(history.last_iteration(), Some(10));
    }

    #[test]
    fn from_parts_rejects_length_mismatch() {
        let result = History::from_parts(vec![field(0.1)], vec![0, 1], vec![vec![1.0]], 1);
        assert_eq!(
            result,
            Err(FieldError::HistoryLength {
                fields: 1,
                indices: 2,
                errors: 1
            })
        );
    }

    #[test]
    fn from_parts_rejects_empty_and_non_monotonic_histories() {
        assert_eq!(
            History::from_parts(vec![], vec![], vec![], 1),
            Err(FieldError::EmptyHistory)
        );
        let result = History::from_parts(
            vec![field(0.1), field(0.2)],
            vec![5, 5],
            vec![vec![1.0], vec![1.0]],
            1,
        );
        assert!(matches!(result, Err(FieldError::NonMonotonicHistory { .. })));
    }

    #[test]
    fn from_parts_rejects_wrong_error_width() {
        let result = History::from_parts(vec![field(0.1)], vec![3], vec![vec![1.0, 2.0]], 1);
        assert!(matches!(result, Err(FieldError::ErrorWidth { .. })));
    }
}
