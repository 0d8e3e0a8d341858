//! Per-segment cubic fitting for a caller-chosen selection.

use crate::cubic::Cubic;
use crate::error::{ReductionError, Result};
use crate::fit::SpanBasis;
use crate::samples::{validate_selection, Samples};

/// One cubic per consecutive pair of `selection`, fitted to single-channel
/// `samples`. The selection may be any strictly increasing subset of the
/// sample indices with at least two entries.
pub fn optimal(samples: &Samples, selection: &[usize]) -> Result<Vec<Cubic>> {
    if samples.dims() != 1 {
        return Err(ReductionError::samples(format!(
            "reduction fits one curve at a time, got {} channels",
            samples.dims()
        )));
    }
    validate_selection(selection, samples.frames(), 2)?;

    let mut cubics = Vec::with_capacity(selection.len() - 1);
    let mut cached: Option<SpanBasis> = None;
    for pair in selection.windows(2) {
        let (s, e) = (pair[0], pair[1]);
        // Evenly spaced selections reuse the previous basis.
        let basis = match cached.take() {
            Some(b) if b.len() == e - s => b,
            _ => SpanBasis::new(e - s),
        };
        cubics.push(basis.cubic(samples, s)?);
        cached = Some(basis);
    }
    Ok(cubics)
}

/// [`optimal`] over a plain value-per-frame slice.
pub fn optimal_for_values(values: &[f64], selection: &[usize]) -> Result<Vec<Cubic>> {
    let samples = Samples::from_curve(values.to_vec())?;
    optimal(&samples, selection)
}
