//! Pinned-endpoint cubic fitting of one span of samples.
//!
//! Model for a span `[s, e]` of length `h = e - s`:
//! - frame `s + u` maps to Bézier parameter `t = u / h`
//! - control point frames sit at the span thirds, so `x(t)` is linear and the
//!   segment is a cubic polynomial in frame
//! - `p1.y = y[s]` and `p4.y = y[e]` are pinned; `p2.y` and `p3.y` are the two
//!   free parameters, solved by linear least squares over the interior frames
//!
//! The unknowns are expressed as offsets from the chord (the straight segment
//! between the pinned endpoints). Spans with fewer than two interior frames have
//! a singular normal matrix; the pseudo-inverse then yields the minimum-norm
//! offsets and an exact (zero error) fit.
//!
//! Relative to the chord, the residual of frame `s + u` is `r0 = z - d·t` with
//! `z = y[s+u] - y[s]` and `d = y[e] - y[s]`. The right-hand side and `Σ r0²`
//! only need the moments `Σ u^k·z` (k = 1..3) and `Σ z²`, which [`SpanSums`]
//! extends one frame at a time while the end frame walks away from a fixed
//! start. [`SpanMoments`] holds the parts that depend on the span length only.
//! Together they give every span's error in constant time.

use nalgebra::{Matrix2, Vector2};

use crate::config::ErrorMetric;
use crate::cubic::{bernstein, Cubic, Vec2};
use crate::error::{ReductionError, Result};
use crate::samples::Samples;

/// Relative determinant below which the normal matrix is treated as singular.
const SINGULAR_EPS: f64 = 1e-12;
/// Singular values below this are dropped by the pseudo-inverse.
const PINV_EPS: f64 = 1e-12;

/// Fitted interior control values for one channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ChannelFit {
    pub p2: f64,
    pub p3: f64,
    pub error: f64,
}

fn accumulate_normal(normal: &mut Matrix2<f64>, w: &[f64; 4]) {
    normal[(0, 0)] += w[1] * w[1];
    normal[(0, 1)] += w[1] * w[2];
    normal[(1, 0)] += w[1] * w[2];
    normal[(1, 1)] += w[2] * w[2];
}

/// Inverse of the 2x2 normal matrix, or its pseudo-inverse when singular.
fn invert_normal(normal: Matrix2<f64>) -> Matrix2<f64> {
    let scale = normal.norm_squared();
    if scale > 0.0 && normal.determinant().abs() > SINGULAR_EPS * scale {
        normal.try_inverse()
    } else {
        None
    }
    .or_else(|| normal.pseudo_inverse(PINV_EPS).ok())
    .unwrap_or_else(Matrix2::zeros)
}

/// Basis weights and normal-matrix solver for spans of one length. Every span
/// of the same length shares them.
#[derive(Clone, Debug)]
pub(crate) struct SpanBasis {
    len: usize,
    weights: Vec<[f64; 4]>,
    solver: Matrix2<f64>,
}

impl SpanBasis {
    pub fn new(len: usize) -> Self {
        debug_assert!(len >= 1, "span length must be >= 1");
        let h = len as f64;
        let weights: Vec<[f64; 4]> = (0..=len).map(|u| bernstein(u as f64 / h)).collect();

        let mut normal = Matrix2::<f64>::zeros();
        for w in &weights[1..len] {
            accumulate_normal(&mut normal, w);
        }

        Self {
            len,
            weights,
            solver: invert_normal(normal),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    fn chord(y0: f64, y1: f64) -> (f64, f64) {
        let d = y1 - y0;
        (y0 + d / 3.0, y0 + 2.0 * d / 3.0)
    }

    /// Least-squares fit of channel `dim` over `[start, start + len]`.
    pub fn fit(&self, samples: &Samples, start: usize, dim: usize) -> ChannelFit {
        let y0 = samples.value(start, dim);
        let y1 = samples.value(start + self.len, dim);
        let (c2, c3) = Self::chord(y0, y1);
        let base = |w: &[f64; 4]| w[0] * y0 + w[1] * c2 + w[2] * c3 + w[3] * y1;

        let mut rhs = Vector2::<f64>::zeros();
        for (u, w) in self.weights.iter().enumerate().take(self.len).skip(1) {
            let r = samples.value(start + u, dim) - base(w);
            rhs[0] += w[1] * r;
            rhs[1] += w[2] * r;
        }
        let offsets = self.solver * rhs;
        let (a, b) = (offsets[0], offsets[1]);

        let mut error = 0.0;
        for (u, w) in self.weights.iter().enumerate().take(self.len).skip(1) {
            let fitted = base(w) + w[1] * a + w[2] * b;
            let r = samples.value(start + u, dim) - fitted;
            error += r * r;
        }

        ChannelFit {
            p2: c2 + a,
            p3: c3 + b,
            error,
        }
    }

    /// Squared deviation of channel `dim` from the chord over the span.
    pub fn chord_error(&self, samples: &Samples, start: usize, dim: usize) -> f64 {
        let y0 = samples.value(start, dim);
        let y1 = samples.value(start + self.len, dim);
        let h = self.len as f64;
        (1..self.len)
            .map(|u| {
                let line = y0 + (y1 - y0) * (u as f64 / h);
                let r = samples.value(start + u, dim) - line;
                r * r
            })
            .sum()
    }

    /// Error of the span starting at `start`, summed over every channel.
    pub fn span_error(&self, samples: &Samples, start: usize, metric: ErrorMetric) -> Result<f64> {
        let mut total = 0.0;
        for dim in 0..samples.dims() {
            total += match metric {
                ErrorMetric::Curve => self.fit(samples, start, dim).error,
                ErrorMetric::Line => self.chord_error(samples, start, dim),
            };
        }
        if total.is_finite() {
            Ok(total)
        } else {
            Err(ReductionError::NumericDegeneracy {
                start,
                end: start + self.len,
            })
        }
    }

    /// Fitted segment for a single-channel span, in (frame, value) space.
    pub fn cubic(&self, samples: &Samples, start: usize) -> Result<Cubic> {
        let end = start + self.len;
        let fit = self.fit(samples, start, 0);
        if !(fit.p2.is_finite() && fit.p3.is_finite() && fit.error.is_finite()) {
            return Err(ReductionError::NumericDegeneracy { start, end });
        }
        let (s, h) = (start as f64, self.len as f64);
        Ok(Cubic::new(
            Vec2::new(s, samples.value(start, 0)),
            Vec2::new(s + h / 3.0, fit.p2),
            Vec2::new(s + 2.0 * h / 3.0, fit.p3),
            Vec2::new(end as f64, samples.value(end, 0)),
        ))
    }
}

/// Span-length constants for constant-time span errors.
#[derive(Clone, Debug)]
pub(crate) struct SpanMoments {
    len: usize,
    solver: Matrix2<f64>,
    /// `Σ w1(t)·t` and `Σ w2(t)·t` over the interior frames.
    w1t: f64,
    w2t: f64,
    /// `Σ t²` over the interior frames.
    t2: f64,
}

impl SpanMoments {
    pub fn new(len: usize) -> Self {
        debug_assert!(len >= 1, "span length must be >= 1");
        let h = len as f64;
        let mut normal = Matrix2::<f64>::zeros();
        let (mut w1t, mut w2t, mut t2) = (0.0, 0.0, 0.0);
        for u in 1..len {
            let t = u as f64 / h;
            let w = bernstein(t);
            accumulate_normal(&mut normal, &w);
            w1t += w[1] * t;
            w2t += w[2] * t;
            t2 += t * t;
        }
        Self {
            len,
            solver: invert_normal(normal),
            w1t,
            w2t,
            t2,
        }
    }
}

/// Interior moments of one channel for spans sharing a start frame.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SpanSums {
    uz: f64,
    u2z: f64,
    u3z: f64,
    zz: f64,
}

impl SpanSums {
    /// Add interior frame `start + u` with offset value `z = y[start+u] - y[start]`.
    #[inline]
    pub fn push(&mut self, u: usize, z: f64) {
        let u = u as f64;
        self.uz += u * z;
        self.u2z += u * u * z;
        self.u3z += u * u * u * z;
        self.zz += z * z;
    }

    /// Error of a span of length `m.len` whose interior has been pushed;
    /// `d = y[end] - y[start]`.
    pub fn error(&self, m: &SpanMoments, d: f64, metric: ErrorMetric) -> f64 {
        if m.len < 2 || (metric == ErrorMetric::Curve && m.len < 3) {
            return 0.0;
        }
        let h = m.len as f64;
        let tz = self.uz / h;
        let chord = self.zz - 2.0 * d * tz + d * d * m.t2;
        if metric == ErrorMetric::Line {
            return chord.max(0.0);
        }
        let t2z = self.u2z / (h * h);
        let t3z = self.u3z / (h * h * h);
        // w1 = 3(t - 2t² + t³), w2 = 3(t² - t³)
        let rhs = Vector2::new(
            3.0 * (tz - 2.0 * t2z + t3z) - d * m.w1t,
            3.0 * (t2z - t3z) - d * m.w2t,
        );
        let explained = rhs.dot(&(m.solver * rhs));
        (chord - explained).max(0.0)
    }
}

/// Minimal error of one span `[start, end]` under `metric`.
pub fn span_error(samples: &Samples, start: usize, end: usize, metric: ErrorMetric) -> Result<f64> {
    if start >= end || end >= samples.frames() {
        return Err(ReductionError::range(format!(
            "span [{start}, {end}] must satisfy start < end < {}",
            samples.frames()
        )));
    }
    SpanBasis::new(end - start).span_error(samples, start, metric)
}
