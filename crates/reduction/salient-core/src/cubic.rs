//! Cubic Bézier segments in (frame, value) space and their tangent encoding.
//!
//! A segment is stored as four control points. Keyed-curve hosts describe the
//! same shape as an outgoing tangent at `p1` and an incoming tangent at `p4`,
//! each an (angle, weight) pair:
//! - angle: `atan2(dy, dx)` of the tangent vector, radians
//! - weight: tangent vector length divided by the segment's frame span
//!
//! Both encodings are interchangeable without loss.

use serde::{Deserialize, Serialize};

/// 2D point in (frame, value) space.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// Polar encoding of a control point relative to its anchoring endpoint.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Tangent {
    /// Radians.
    pub angle: f64,
    /// Tangent length relative to the segment span.
    pub weight: f64,
}

impl Tangent {
    /// Tangent of a straight segment rising `dy` over `dx`, with the thirds weight
    /// of a linear Bézier.
    pub fn linear(dx: f64, dy: f64) -> Self {
        let angle = dy.atan2(dx);
        let len = (dx * dx + dy * dy).sqrt();
        let weight = if dx != 0.0 { len / (3.0 * dx.abs()) } else { 0.0 };
        Self { angle, weight }
    }
}

/// Bernstein basis of degree 3 at `t`.
#[inline]
pub(crate) fn bernstein(t: f64) -> [f64; 4] {
    let u = 1.0 - t;
    [u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t]
}

/// Cubic Bezier basis function
#[inline]
fn cubic_bezier(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let b = bernstein(t);
    b[0] * p0 + b[1] * p1 + b[2] * p2 + b[3] * p3
}

/// One fitted segment between two consecutive keyframes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Cubic {
    pub p1: Vec2,
    pub p2: Vec2,
    pub p3: Vec2,
    pub p4: Vec2,
}

impl Cubic {
    pub fn new(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> Self {
        Self { p1, p2, p3, p4 }
    }

    /// Rebuild the control points from endpoint anchors and tangents.
    pub fn from_tangents(p1: Vec2, out_tangent: Tangent, in_tangent: Tangent, p4: Vec2) -> Self {
        let span = p4.x - p1.x;
        let out_len = out_tangent.weight * span;
        let in_len = in_tangent.weight * span;
        let p2 = Vec2::new(
            p1.x + out_len * out_tangent.angle.cos(),
            p1.y + out_len * out_tangent.angle.sin(),
        );
        let p3 = Vec2::new(
            p4.x - in_len * in_tangent.angle.cos(),
            p4.y - in_len * in_tangent.angle.sin(),
        );
        Self { p1, p2, p3, p4 }
    }

    /// Frame distance covered by the segment.
    #[inline]
    pub fn span(&self) -> f64 {
        self.p4.x - self.p1.x
    }

    fn tangent(&self, from: Vec2, to: Vec2) -> Tangent {
        let d = Vec2::new(to.x - from.x, to.y - from.y);
        let span = self.span();
        Tangent {
            angle: d.y.atan2(d.x),
            weight: if span != 0.0 {
                d.length() / span.abs()
            } else {
                0.0
            },
        }
    }

    /// Outgoing tangent at `p1`.
    pub fn out_tangent(&self) -> Tangent {
        self.tangent(self.p1, self.p2)
    }

    /// Incoming tangent at `p4`.
    pub fn in_tangent(&self) -> Tangent {
        self.tangent(self.p3, self.p4)
    }

    /// Point on the curve at parameter `t` in [0,1].
    pub fn point(&self, t: f64) -> Vec2 {
        let t = t.clamp(0.0, 1.0);
        Vec2::new(
            cubic_bezier(self.p1.x, self.p2.x, self.p3.x, self.p4.x, t),
            cubic_bezier(self.p1.y, self.p2.y, self.p3.y, self.p4.y, t),
        )
    }

    /// Curve value at frame `x`, inverting `x(t)` by binary search.
    /// Assumes `x(t)` is monotonic, which holds while both interior control
    /// points stay inside the span. Frames outside the span hold the endpoint.
    pub fn value_at(&self, x: f64) -> f64 {
        let (x0, x1) = (self.p1.x, self.p4.x);
        if x <= x0.min(x1) {
            return if x0 <= x1 { self.p1.y } else { self.p4.y };
        }
        if x >= x0.max(x1) {
            return if x0 <= x1 { self.p4.y } else { self.p1.y };
        }
        let increasing = x1 > x0;
        let tolerance = 1e-12 * self.span().abs().max(1.0);
        let mut lo = 0.0f64;
        let mut hi = 1.0f64;
        let mut mid = (x - x0) / (x1 - x0);
        for _ in 0..64 {
            let px = cubic_bezier(x0, self.p2.x, self.p3.x, x1, mid);
            if (px - x).abs() < tolerance {
                break;
            }
            if (px < x) == increasing {
                lo = mid;
            } else {
                hi = mid;
            }
            mid = 0.5 * (lo + hi);
        }
        cubic_bezier(self.p1.y, self.p2.y, self.p3.y, self.p4.y, mid)
    }

    /// Affine change of coordinates: `x' = (x + offset_x) * scale_x`, `y' = y * scale_y`.
    pub fn mapped(&self, offset_x: f64, scale_x: f64, scale_y: f64) -> Self {
        let map = |p: Vec2| Vec2::new((p.x + offset_x) * scale_x, p.y * scale_y);
        Self {
            p1: map(self.p1),
            p2: map(self.p2),
            p3: map(self.p3),
            p4: map(self.p4),
        }
    }

    /// `p1x, p1y, p2x, p2y, p3x, p3y, p4x, p4y`.
    pub fn to_array(&self) -> [f64; 8] {
        [
            self.p1.x, self.p1.y, self.p2.x, self.p2.y, self.p3.x, self.p3.y, self.p4.x, self.p4.y,
        ]
    }

    /// Inverse of [`Cubic::to_array`]; `None` unless exactly 8 values are given.
    pub fn from_slice(v: &[f64]) -> Option<Self> {
        match v {
            [p1x, p1y, p2x, p2y, p3x, p3y, p4x, p4y] => Some(Self {
                p1: Vec2::new(*p1x, *p1y),
                p2: Vec2::new(*p2x, *p2y),
                p3: Vec2::new(*p3x, *p3y),
                p4: Vec2::new(*p4x, *p4y),
            }),
            _ => None,
        }
    }
}
