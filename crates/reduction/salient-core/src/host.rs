//! Host adapter: sampling keyed curves into dense frame values and writing
//! fitted cubics back as keys and tangents.
//!
//! Hosts store time in seconds and angular values in radians. The numeric core
//! works in frames and, for angular curves, in the configured display unit.
//! [`SamplerConfig`] carries that unit state explicitly.

use hashbrown::HashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{default_max_keyframes, SamplerConfig, SelectConfig};
use crate::cubic::{Cubic, Tangent, Vec2};
use crate::error::{ReductionError, Result};
use crate::error_table::ErrorTable;
use crate::interpolator;
use crate::samples::Samples;
use crate::selector::{self, SelectionSet};

/// Keys closer than this (seconds) are treated as the same key.
const TIME_EPSILON: f64 = 1e-9;

/// Read side of a host animation curve.
/// Adapters (scene graphs, DCC bridges) implement this over their own curve type.
pub trait CurveSource {
    /// Value at `seconds`, in the host's internal unit.
    fn evaluate(&self, seconds: f64) -> f64;
    /// Whether values are angles (stored in radians).
    fn is_angular(&self) -> bool;
}

/// Write side of a host animation curve.
pub trait CurveWriter {
    /// Replace the keys inside `[frames[0], frames[last]]` with one key per
    /// entry of `frames`, shaped by `cubics`. Cubic coordinates are frame
    /// offsets from `frames[0]` and values in the sampled unit.
    fn write_reduction(&mut self, frames: &[i64], cubics: &[Cubic], cfg: &SamplerConfig)
        -> Result<()>;
}

fn check_rate(cfg: &SamplerConfig) -> Result<f64> {
    let fps = cfg.frames_per_second;
    if fps.is_finite() && fps > 0.0 {
        Ok(fps)
    } else {
        Err(ReductionError::range(format!(
            "frames per second must be positive, got {fps}"
        )))
    }
}

/// Dense value-per-frame samples of `curve` over `[start, finish]`.
pub fn sample_curve<C: CurveSource + ?Sized>(
    curve: &C,
    start: i64,
    finish: i64,
    cfg: &SamplerConfig,
) -> Result<Vec<f64>> {
    if finish < start {
        return Err(ReductionError::range(format!(
            "finish frame {finish} is before start frame {start}"
        )));
    }
    let fps = check_rate(cfg)?;
    let scale = cfg.value_scale(curve.is_angular());
    Ok((start..=finish)
        .map(|frame| curve.evaluate(frame as f64 / fps) * scale)
        .collect())
}

/// One key on a [`KeyedCurve`]. Tangents live in (seconds, internal value)
/// space; `in_tangent` shapes the segment ending here, `out_tangent` the one
/// starting here.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub time: f64,
    pub value: f64,
    pub in_tangent: Tangent,
    pub out_tangent: Tangent,
}

/// In-memory keyed Bézier curve standing in for a host curve.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyedCurve {
    keys: Vec<Key>,
    angular: bool,
    tangents_locked: bool,
    weights_locked: bool,
}

impl KeyedCurve {
    pub fn new(angular: bool) -> Self {
        Self {
            angular,
            ..Self::default()
        }
    }

    /// Piecewise-linear curve through `(seconds, value)` points.
    pub fn from_points(points: &[(f64, f64)], angular: bool) -> Result<Self> {
        for pair in points.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(ReductionError::samples(format!(
                    "key times must be strictly increasing ({} then {})",
                    pair[0].0, pair[1].0
                )));
            }
        }
        let mut keys: Vec<Key> = points
            .iter()
            .map(|&(time, value)| Key {
                time,
                value,
                in_tangent: Tangent::default(),
                out_tangent: Tangent::default(),
            })
            .collect();
        for i in 1..keys.len() {
            let t = Tangent::linear(keys[i].time - keys[i - 1].time, keys[i].value - keys[i - 1].value);
            keys[i - 1].out_tangent = t;
            keys[i].in_tangent = t;
        }
        Ok(Self {
            keys,
            angular,
            tangents_locked: true,
            weights_locked: true,
        })
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn tangents_locked(&self) -> bool {
        self.tangents_locked
    }

    pub fn weights_locked(&self) -> bool {
        self.weights_locked
    }

    pub fn set_locks(&mut self, tangents: bool, weights: bool) {
        self.tangents_locked = tangents;
        self.weights_locked = weights;
    }

    /// Segment between key `i` and key `i + 1` in (seconds, internal value) space.
    pub fn segment(&self, i: usize) -> Option<Cubic> {
        let (a, b) = (self.keys.get(i)?, self.keys.get(i + 1)?);
        Some(Cubic::from_tangents(
            Vec2::new(a.time, a.value),
            a.out_tangent,
            b.in_tangent,
            Vec2::new(b.time, b.value),
        ))
    }

    fn key_at(&self, time: f64) -> Option<&Key> {
        self.keys.iter().find(|k| (k.time - time).abs() <= TIME_EPSILON)
    }
}

impl CurveSource for KeyedCurve {
    fn evaluate(&self, seconds: f64) -> f64 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return 0.0,
        };
        if seconds <= first.time {
            return first.value;
        }
        if seconds >= last.time {
            return last.value;
        }
        // First key strictly after `seconds`; the segment starts one before it.
        let next = self.keys.partition_point(|k| k.time <= seconds);
        match self.segment(next - 1) {
            Some(seg) => seg.value_at(seconds),
            None => last.value,
        }
    }

    fn is_angular(&self) -> bool {
        self.angular
    }
}

impl CurveWriter for KeyedCurve {
    fn write_reduction(
        &mut self,
        frames: &[i64],
        cubics: &[Cubic],
        cfg: &SamplerConfig,
    ) -> Result<()> {
        if frames.len() < 2 || cubics.len() + 1 != frames.len() {
            return Err(ReductionError::selection(format!(
                "{} keyframes cannot carry {} cubics",
                frames.len(),
                cubics.len()
            )));
        }
        if frames.windows(2).any(|p| p[1] <= p[0]) {
            return Err(ReductionError::selection(
                "keyframes must be strictly increasing",
            ));
        }
        let fps = check_rate(cfg)?;
        let scale = cfg.value_scale(self.angular);
        let origin = frames[0];

        // Back to host time and units before deriving tangents.
        let host: Vec<Cubic> = cubics
            .iter()
            .map(|c| c.mapped(origin as f64, 1.0 / fps, 1.0 / scale))
            .collect();

        self.set_locks(false, false);

        let t_start = frames[0] as f64 / fps;
        let t_end = frames[frames.len() - 1] as f64 / fps;
        let kept_in = self.key_at(t_start).map(|k| k.in_tangent);
        let kept_out = self.key_at(t_end).map(|k| k.out_tangent);

        let mut written = Vec::with_capacity(frames.len());
        for (i, &frame) in frames.iter().enumerate() {
            let time = frame as f64 / fps;
            let (value, out_tangent) = match host.get(i) {
                Some(seg) => (seg.p1.y, seg.out_tangent()),
                None => (host[i - 1].p4.y, kept_out.unwrap_or_else(|| host[i - 1].in_tangent())),
            };
            let in_tangent = if i == 0 {
                kept_in.unwrap_or(out_tangent)
            } else {
                host[i - 1].in_tangent()
            };
            written.push(Key {
                time,
                value,
                in_tangent,
                out_tangent,
            });
        }

        let before = self
            .keys
            .iter()
            .copied()
            .filter(|k| k.time < t_start - TIME_EPSILON);
        let after = self
            .keys
            .iter()
            .copied()
            .filter(|k| k.time > t_end + TIME_EPSILON);
        let removed = self.keys.len() - before.clone().count() - after.clone().count();
        let keys: Vec<Key> = before.chain(written).chain(after).collect();
        debug!(
            "replaced {removed} keys in [{}, {}] with {}",
            frames[0],
            frames[frames.len() - 1],
            frames.len()
        );
        self.keys = keys;
        Ok(())
    }
}

/// Names one animated attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributePath {
    pub object: String,
    pub attribute: String,
}

impl AttributePath {
    pub fn new(object: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            attribute: attribute.into(),
        }
    }
}

/// Object/attribute lookup of animation curves.
#[derive(Clone, Debug, Default)]
pub struct CurveSet {
    curves: HashMap<AttributePath, KeyedCurve>,
}

impl CurveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the curve driving `object.attribute`.
    pub fn insert(
        &mut self,
        object: impl Into<String>,
        attribute: impl Into<String>,
        curve: KeyedCurve,
    ) -> Option<KeyedCurve> {
        self.curves
            .insert(AttributePath::new(object, attribute), curve)
    }

    pub fn curve(&self, object: &str, attribute: &str) -> Result<&KeyedCurve> {
        self.curves
            .get(&AttributePath::new(object, attribute))
            .ok_or_else(|| missing(object, attribute))
    }

    pub fn curve_mut(&mut self, object: &str, attribute: &str) -> Result<&mut KeyedCurve> {
        self.curves
            .get_mut(&AttributePath::new(object, attribute))
            .ok_or_else(|| missing(object, attribute))
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

fn missing(object: &str, attribute: &str) -> ReductionError {
    ReductionError::NoMatchingCurve {
        object: object.to_string(),
        attribute: attribute.to_string(),
    }
}

/// Sample every attribute over `[start, finish]` into one channel each.
pub fn sample_attributes(
    set: &CurveSet,
    attributes: &[AttributePath],
    start: i64,
    finish: i64,
    cfg: &SamplerConfig,
) -> Result<Samples> {
    if attributes.is_empty() {
        return Err(ReductionError::samples("no attributes to sample"));
    }
    let channels = attributes
        .iter()
        .map(|path| {
            let curve = set.curve(&path.object, &path.attribute)?;
            sample_curve(curve, start, finish, cfg)
        })
        .collect::<Result<Vec<_>>>()?;
    Samples::from_channels(&channels)
}

/// Sample the attributes over `[start, end]` and select keyframes jointly.
/// Selections are frame offsets from `start`. Without `max_keyframes` a fifth
/// of the range is used.
pub fn select_attributes(
    set: &CurveSet,
    attributes: &[AttributePath],
    start: i64,
    end: i64,
    max_keyframes: Option<usize>,
    select_cfg: &SelectConfig,
    sampler_cfg: &SamplerConfig,
) -> Result<SelectionSet> {
    let samples = sample_attributes(set, attributes, start, end, sampler_cfg)?;
    let frames = samples.frames();
    let max_keyframes = max_keyframes.unwrap_or_else(|| default_max_keyframes(frames));
    let table = ErrorTable::with_config(&samples, select_cfg)?;
    selector::up_to_n_with_fixed(
        frames,
        max_keyframes,
        &samples,
        &table,
        &select_cfg.fixed_keyframes,
    )
}

/// Fit the attribute's curve between consecutive absolute `frames` and write
/// the result back onto it. Returns the fitted cubics (frame offsets from
/// `frames[0]`, sampled units).
pub fn reduce_attribute(
    set: &mut CurveSet,
    object: &str,
    attribute: &str,
    frames: &[i64],
    cfg: &SamplerConfig,
) -> Result<Vec<Cubic>> {
    let (first, last) = match (frames.first(), frames.last()) {
        (Some(&f), Some(&l)) if frames.len() >= 2 => (f, l),
        _ => {
            return Err(ReductionError::selection(format!(
                "expected at least 2 keyframes, got {}",
                frames.len()
            )))
        }
    };
    let values = sample_curve(set.curve(object, attribute)?, first, last, cfg)?;
    let selection = frames
        .iter()
        .map(|&f| {
            f.checked_sub(first)
                .and_then(|d| usize::try_from(d).ok())
                .ok_or_else(|| {
                    ReductionError::selection(format!(
                        "keyframe {f} is before the first keyframe {first}"
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()?;
    let cubics = interpolator::optimal_for_values(&values, &selection)?;
    set.curve_mut(object, attribute)?
        .write_reduction(frames, &cubics, cfg)?;
    Ok(cubics)
}
