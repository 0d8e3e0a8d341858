//! Dense per-frame sample matrix consumed by the selection and reduction pipelines.

use serde::{Deserialize, Serialize};

use crate::error::{ReductionError, Result};

/// `dims x frames` matrix of finite values, stored frame-major (channel index
/// varies fastest). Frame 0 is the start of the sampled range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Samples {
    dims: usize,
    frames: usize,
    data: Vec<f64>,
}

impl Samples {
    /// Build from a flat interleaved buffer holding `frames` frames. The channel
    /// count is inferred as `data.len() / frames`.
    pub fn from_interleaved(data: Vec<f64>, frames: usize) -> Result<Self> {
        if frames == 0 {
            return Err(ReductionError::samples("frame count must be > 0"));
        }
        if data.is_empty() || data.len() % frames != 0 {
            return Err(ReductionError::samples(format!(
                "data length {} is not a positive multiple of {frames} frames",
                data.len()
            )));
        }
        let dims = data.len() / frames;
        Self::validate_finite(&data, dims)?;
        Ok(Self { dims, frames, data })
    }

    /// Single-channel samples, one value per frame.
    pub fn from_curve(values: Vec<f64>) -> Result<Self> {
        let frames = values.len();
        Self::from_interleaved(values, frames)
    }

    /// Stack equally long channels into one matrix.
    pub fn from_channels(channels: &[Vec<f64>]) -> Result<Self> {
        let Some(first) = channels.first() else {
            return Err(ReductionError::samples("at least one channel is required"));
        };
        let frames = first.len();
        if let Some(bad) = channels.iter().position(|c| c.len() != frames) {
            return Err(ReductionError::samples(format!(
                "channel {bad} has {} frames, expected {frames}",
                channels[bad].len()
            )));
        }
        let mut data = Vec::with_capacity(frames * channels.len());
        for f in 0..frames {
            for channel in channels {
                data.push(channel[f]);
            }
        }
        Self::from_interleaved(data, frames)
    }

    fn validate_finite(data: &[f64], dims: usize) -> Result<()> {
        match data.iter().position(|v| !v.is_finite()) {
            Some(i) => Err(ReductionError::samples(format!(
                "non-finite value at frame {} channel {}",
                i / dims,
                i % dims
            ))),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn dims(&self) -> usize {
        self.dims
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// All channels of one frame.
    #[inline]
    pub fn frame(&self, index: usize) -> &[f64] {
        let at = index * self.dims;
        &self.data[at..at + self.dims]
    }

    #[inline]
    pub fn value(&self, frame: usize, dim: usize) -> f64 {
        self.data[frame * self.dims + dim]
    }

    /// Values of one channel across all frames.
    pub fn channel(&self, dim: usize) -> Vec<f64> {
        (0..self.frames).map(|f| self.value(f, dim)).collect()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Check that `selection` is a strictly increasing list of at least `min_len`
/// indices into a range of `frames` frames.
pub fn validate_selection(selection: &[usize], frames: usize, min_len: usize) -> Result<()> {
    if selection.len() < min_len {
        return Err(ReductionError::selection(format!(
            "expected at least {min_len} keyframes, got {}",
            selection.len()
        )));
    }
    for pair in selection.windows(2) {
        if pair[1] <= pair[0] {
            return Err(ReductionError::selection(format!(
                "keyframes must be strictly increasing ({} then {})",
                pair[0], pair[1]
            )));
        }
    }
    if let Some(&last) = selection.last() {
        if last >= frames {
            return Err(ReductionError::selection(format!(
                "keyframe {last} is outside the {frames} sampled frames"
            )));
        }
    }
    Ok(())
}
