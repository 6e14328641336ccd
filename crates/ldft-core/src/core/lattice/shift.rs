use super::geometry::{GeometryError, LatticeGeometry, ShiftPlan};
use ndarray::{ArrayBase, ArrayD, Axis, Data, IxDyn, Slice};

/// Circularly shifts `array` by `steps` sites along `axis`.
///
/// The element at index `i` moves to index `(i + steps) mod len`; negative
/// steps shift towards lower indices.
///
/// # Panics
///
/// Panics if `axis` is not an axis of `array`.
pub fn roll<A, S>(array: &ArrayBase<S, IxDyn>, steps: isize, axis: usize) -> ArrayD<A>
where
    A: Clone,
    S: Data<Elem = A>,
{
    let len = array.len_of(Axis(axis));
    let mut out = array.to_owned();
    if len == 0 {
        return out;
    }
    let k = steps.rem_euclid(len as isize) as usize;
    if k == 0 {
        return out;
    }
    out.slice_axis_mut(Axis(axis), Slice::from(k..))
        .assign(&array.slice_axis(Axis(axis), Slice::from(..len - k)));
    out.slice_axis_mut(Axis(axis), Slice::from(..k))
        .assign(&array.slice_axis(Axis(axis), Slice::from(len - k..)));
    out
}

/// Circularly shifts `array` along `roll_axis`, displacing every slab that
/// crosses the boundary by `shift` sites along `shift_axis`.
///
/// Each crossing in the positive direction adds `shift`, each crossing in the
/// negative direction subtracts it, so arbitrarily large step counts compose
/// consistently and `tilted_roll(tilted_roll(a, s, ..), -s, ..) == a`.
///
/// # Panics
///
/// Panics if either axis is not an axis of `array`, or if both are equal.
pub fn tilted_roll<A, S>(
    array: &ArrayBase<S, IxDyn>,
    steps: isize,
    roll_axis: usize,
    shift: isize,
    shift_axis: usize,
) -> ArrayD<A>
where
    A: Clone,
    S: Data<Elem = A>,
{
    assert_ne!(roll_axis, shift_axis, "roll and shift axes must differ");
    let len = array.len_of(Axis(roll_axis)) as isize;
    if len == 0 {
        return array.to_owned();
    }
    let full_wraps = steps.div_euclid(len);
    let partial = steps.rem_euclid(len);

    let mut out = roll(array, full_wraps * shift, shift_axis);
    if partial > 0 {
        let crossing = Slice::from((len - partial) as usize..);
        let displaced = roll(&out.slice_axis(Axis(roll_axis), crossing), shift, shift_axis);
        out.slice_axis_mut(Axis(roll_axis), crossing).assign(&displaced);
    }
    roll(&out, partial, roll_axis)
}

impl LatticeGeometry {
    /// Shifts a lattice array by `steps` sites along `axis`, honoring the
    /// boundary topology.
    ///
    /// Shape and the multiset of values are preserved; shifting back by
    /// `-steps` restores the input exactly for every topology.
    ///
    /// # Arguments
    ///
    /// * `array` - An array whose shape equals the lattice size.
    /// * `steps` - Number of sites to shift; negative values shift backwards.
    /// * `axis` - The lattice axis to shift along.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the array shape does not match the lattice
    /// or the axis is out of range.
    pub fn shift<A, S>(
        &self,
        array: &ArrayBase<S, IxDyn>,
        steps: isize,
        axis: usize,
    ) -> Result<ArrayD<A>, GeometryError>
    where
        A: Clone,
        S: Data<Elem = A>,
    {
        self.check_shape(array.shape())?;
        let shifted = match self.shift_plan(axis)? {
            ShiftPlan::Periodic => roll(array, steps, axis),
            ShiftPlan::Tilted { shift_axis, shift } => {
                tilted_roll(array, steps, axis, shift, shift_axis)
            }
        };
        Ok(shifted)
    }

    /// Sum over the `2 * dim` nearest neighbours of every site.
    pub fn nearest_neighbour_sum(&self, array: &ArrayD<f64>) -> Result<ArrayD<f64>, GeometryError> {
        let mut total = ArrayD::<f64>::zeros(self.shape());
        for axis in 0..self.dim() {
            total += &self.shift(array, 1, axis)?;
            total += &self.shift(array, -1, axis)?;
        }
        Ok(total)
    }
}
