//! Precomputed span errors for every pair of frames.
//!
//! Rows are filled per start frame with running interior sums, so each span
//! costs O(channels) and the whole table O(frames² · channels).

use log::debug;

use crate::config::{ErrorMetric, SelectConfig};
use crate::error::{ReductionError, Result};
use crate::fit::{SpanMoments, SpanSums};
use crate::samples::Samples;

/// Upper-triangular table of `error(i, j)` for `0 <= i < j < frames`, built
/// eagerly and read-only afterwards.
#[derive(Clone, Debug)]
pub struct ErrorTable {
    frames: usize,
    metric: ErrorMetric,
    errors: Vec<f64>,
}

impl ErrorTable {
    /// Build the table with the default curve metric and size limit.
    pub fn new(samples: &Samples) -> Result<Self> {
        Self::with_config(samples, &SelectConfig::default())
    }

    pub fn with_config(samples: &Samples, cfg: &SelectConfig) -> Result<Self> {
        let frames = samples.frames();
        if frames > cfg.max_table_frames {
            return Err(ReductionError::SpanTableTooLarge {
                frames,
                limit: cfg.max_table_frames,
            });
        }
        let entries = frames * frames.saturating_sub(1) / 2;
        debug!(
            "building {:?} span table: {frames} frames x {} channels, {entries} spans",
            cfg.metric,
            samples.dims()
        );

        let moments: Vec<SpanMoments> = (1..frames).map(SpanMoments::new).collect();
        let dims = samples.dims();
        let mut sums = vec![SpanSums::default(); dims];
        let mut errors = Vec::with_capacity(entries);
        // Row-major: all spans of one start frame, growing the end frame.
        for start in 0..frames.saturating_sub(1) {
            sums.fill(SpanSums::default());
            let origin = samples.frame(start);
            for end in start + 1..frames {
                let len = end - start;
                let moments = &moments[len - 1];
                let mut err = 0.0;
                for (dim, acc) in sums.iter_mut().enumerate() {
                    if len >= 2 {
                        acc.push(len - 1, samples.value(end - 1, dim) - origin[dim]);
                    }
                    let d = samples.value(end, dim) - origin[dim];
                    err += acc.error(moments, d, cfg.metric);
                }
                if !err.is_finite() {
                    return Err(ReductionError::NumericDegeneracy { start, end });
                }
                errors.push(err);
            }
        }
        debug_assert_eq!(errors.len(), entries);

        Ok(Self {
            frames,
            metric: cfg.metric,
            errors,
        })
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> usize {
        // Row i holds spans (i, i+1) .. (i, frames-1).
        i * self.frames - i * (i + 1) / 2 + (j - i - 1)
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn metric(&self) -> ErrorMetric {
        self.metric
    }

    /// Error of the span `[i, j]`; requires `i < j < frames`.
    pub fn error_of(&self, i: usize, j: usize) -> Result<f64> {
        if i >= j || j >= self.frames {
            return Err(ReductionError::range(format!(
                "span [{i}, {j}] must satisfy start < end < {}",
                self.frames
            )));
        }
        Ok(self.get(i, j))
    }

    /// Unchecked lookup for callers that already hold `i < j < frames`.
    #[inline]
    pub(crate) fn get(&self, i: usize, j: usize) -> f64 {
        self.errors[self.index(i, j)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_TABLE_FRAMES;
    use crate::fit::span_error;

    #[test]
    fn table_matches_direct_span_fits() {
        let values: Vec<f64> = (0..9).map(|f| ((f as f64) * 0.7).sin() * 3.0).collect();
        let samples = Samples::from_curve(values).unwrap();
        let table = ErrorTable::new(&samples).unwrap();
        for i in 0..9 {
            for j in i + 1..9 {
                let direct = span_error(&samples, i, j, ErrorMetric::Curve).unwrap();
                let tabulated = table.error_of(i, j).unwrap();
                assert!(
                    (tabulated - direct).abs() <= 1e-9 * direct.max(1.0),
                    "span ({i},{j}): {tabulated} vs {direct}"
                );
            }
        }
    }

    #[test]
    fn multi_channel_line_table_matches_direct_span_fits() {
        let channels: Vec<Vec<f64>> = (0..3)
            .map(|d| (0..15).map(|f| (f as f64 * 0.3 + d as f64).cos() * 4.0 + d as f64 * 50.0).collect())
            .collect();
        let samples = Samples::from_channels(&channels).unwrap();
        let cfg = SelectConfig {
            metric: ErrorMetric::Line,
            ..SelectConfig::default()
        };
        let table = ErrorTable::with_config(&samples, &cfg).unwrap();
        assert_eq!(table.metric(), ErrorMetric::Line);
        for i in 0..15 {
            for j in i + 1..15 {
                let direct = span_error(&samples, i, j, ErrorMetric::Line).unwrap();
                let tabulated = table.error_of(i, j).unwrap();
                assert!(
                    (tabulated - direct).abs() <= 1e-9 * direct.max(1.0),
                    "span ({i},{j}): {tabulated} vs {direct}"
                );
            }
        }
    }

    #[test]
    fn longest_allowed_range_builds_quickly() {
        let values: Vec<f64> = (0..DEFAULT_MAX_TABLE_FRAMES)
            .map(|f| (f as f64 / 40.0).sin() * 30.0 + (f % 7) as f64)
            .collect();
        let samples = Samples::from_curve(values).unwrap();
        let table = ErrorTable::new(&samples).unwrap();
        assert_eq!(table.frames(), DEFAULT_MAX_TABLE_FRAMES);
        for (i, j) in [(0, 2047), (100, 400), (1500, 1503), (2000, 2046)] {
            let direct = span_error(&samples, i, j, ErrorMetric::Curve).unwrap();
            let tabulated = table.error_of(i, j).unwrap();
            assert!(
                (tabulated - direct).abs() <= 1e-7 * direct.max(1.0),
                "span ({i},{j}): {tabulated} vs {direct}"
            );
        }
    }

    #[test]
    fn longer_spans_can_fit_better() {
        // Pinned endpoints: moving the end frame moves the pinned value too.
        let samples = Samples::from_curve(vec![0.0, 0.0, 10.0, 0.0, 0.0, -6.0]).unwrap();
        let table = ErrorTable::new(&samples).unwrap();
        let shorter = table.error_of(0, 4).unwrap();
        let longer = table.error_of(0, 5).unwrap();
        assert!(longer < shorter, "{longer} vs {shorter}");
        assert!((shorter - 52.9412).abs() < 1e-3);
        assert!((longer - 52.4825).abs() < 1e-3);
    }

    #[test]
    fn rejects_invalid_spans_and_oversized_ranges() {
        let samples = Samples::from_curve(vec![0.0; 5]).unwrap();
        let table = ErrorTable::new(&samples).unwrap();
        assert!(table.error_of(2, 2).is_err());
        assert!(table.error_of(3, 1).is_err());
        assert!(table.error_of(0, 5).is_err());

        let cfg = SelectConfig {
            max_table_frames: 4,
            ..SelectConfig::default()
        };
        assert!(matches!(
            ErrorTable::with_config(&samples, &cfg),
            Err(ReductionError::SpanTableTooLarge {
                frames: 5,
                limit: 4
            })
        ));
    }
}
