//! Configuration for selection and host sampling.

use serde::{Deserialize, Serialize};

/// Default upper bound on the frame count accepted by the span error table.
pub const DEFAULT_MAX_TABLE_FRAMES: usize = 2048;

/// Fraction of the frame range suggested as the largest keyframe count when the
/// caller does not pick one.
pub const DEFAULT_MAX_KEYFRAME_RATIO: f64 = 0.2;

/// How a single span between two keyframes is scored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMetric {
    /// Squared deviation from the straight chord between the span endpoints.
    /// Picks extreme poses.
    Line,
    /// Squared residual of the best pinned cubic over the span.
    #[default]
    Curve,
}

/// Options for a Select call.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectConfig {
    pub metric: ErrorMetric,
    /// Frame offsets (relative to the range start) every selection must contain.
    pub fixed_keyframes: Vec<usize>,
    /// The span table stores L*(L-1)/2 entries; ranges longer than this fail fast.
    pub max_table_frames: usize,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            metric: ErrorMetric::Curve,
            fixed_keyframes: Vec::new(),
            max_table_frames: DEFAULT_MAX_TABLE_FRAMES,
        }
    }
}

/// Unit used for angular curves when they are sampled for the core.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    #[default]
    Degrees,
    Radians,
}

/// Explicit host unit state handed to the sampler/writer adapters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Playback rate used to map integer frames onto host time (seconds).
    pub frames_per_second: f64,
    pub angle_unit: AngleUnit,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            frames_per_second: 24.0,
            angle_unit: AngleUnit::Degrees,
        }
    }
}

impl SamplerConfig {
    /// Scale applied to host values of a curve before they reach the core.
    pub fn value_scale(&self, angular: bool) -> f64 {
        if angular && self.angle_unit == AngleUnit::Degrees {
            1.0f64.to_degrees()
        } else {
            1.0
        }
    }
}

/// Suggested `max_keyframes` for a frame range: a fifth of the frames, never
/// below the three-keyframe minimum and never above the frame count.
pub fn default_max_keyframes(frames: usize) -> usize {
    let suggested = (frames as f64 * DEFAULT_MAX_KEYFRAME_RATIO) as usize;
    suggested.max(3).min(frames)
}

impl std::str::FromStr for ErrorMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(Self::Line),
            "curve" => Ok(Self::Curve),
            other => Err(format!("unknown error metric '{other}' (expected line or curve)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_keyframe_suggestion_is_bounded() {
        assert_eq!(default_max_keyframes(100), 20);
        assert_eq!(default_max_keyframes(10), 3);
        assert_eq!(default_max_keyframes(2), 2);
    }

    #[test]
    fn configs_deserialize_with_defaults() {
        let cfg: SelectConfig = serde_json::from_str(r#"{ "metric": "line" }"#).unwrap();
        assert_eq!(cfg.metric, ErrorMetric::Line);
        assert!(cfg.fixed_keyframes.is_empty());
        assert_eq!(cfg.max_table_frames, DEFAULT_MAX_TABLE_FRAMES);

        let sampler: SamplerConfig = serde_json::from_str(r#"{ "angle_unit": "radians" }"#).unwrap();
        assert_eq!(sampler.angle_unit, AngleUnit::Radians);
        assert_eq!(sampler.frames_per_second, 24.0);
        assert_eq!(sampler.value_scale(true), 1.0);
        assert_eq!(SamplerConfig::default().value_scale(false), 1.0);
    }

    #[test]
    fn metric_names_parse() {
        assert_eq!("Line".parse::<ErrorMetric>(), Ok(ErrorMetric::Line));
        assert_eq!(" curve ".parse::<ErrorMetric>(), Ok(ErrorMetric::Curve));
        assert!("spline".parse::<ErrorMetric>().is_err());
    }
}
