//! Error type shared by every salient operation.

use serde::{Deserialize, Serialize};

pub type Result<T, E = ReductionError> = std::result::Result<T, E>;

/// Every precondition or numeric failure a Select/Reduce call can report.
/// Calls fail as a whole; no variant carries partial output.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ReductionError {
    /// Positional argument list has the wrong arity.
    #[error("{command}: expected {expected} arguments, got {actual}")]
    InvalidArgumentCount {
        command: String,
        expected: String,
        actual: usize,
    },

    /// Positional argument has the wrong kind.
    #[error("{command}: argument {index} {reason}")]
    InvalidArgument {
        command: String,
        index: usize,
        reason: String,
    },

    /// Frame range or keyframe count outside what the operation accepts.
    #[error("invalid range: {reason}")]
    InvalidRange { reason: String },

    /// Host lookup for an animated attribute failed.
    #[error("did not find a curve matching {object}.{attribute}")]
    NoMatchingCurve { object: String, attribute: String },

    #[error("malformed selection: {reason}")]
    MalformedSelection { reason: String },

    #[error("malformed samples: {reason}")]
    MalformedSamples { reason: String },

    /// A span fit produced non-finite control points or error.
    #[error("fit of span [{start}, {end}] did not produce finite values")]
    NumericDegeneracy { start: usize, end: usize },

    #[error("span table for {frames} frames exceeds the limit of {limit} frames")]
    SpanTableTooLarge { frames: usize, limit: usize },
}

impl ReductionError {
    pub(crate) fn range(reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            reason: reason.into(),
        }
    }

    pub(crate) fn selection(reason: impl Into<String>) -> Self {
        Self::MalformedSelection {
            reason: reason.into(),
        }
    }

    pub(crate) fn samples(reason: impl Into<String>) -> Self {
        Self::MalformedSamples {
            reason: reason.into(),
        }
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgumentCount { .. } | Self::InvalidArgument { .. } => "arguments",
            Self::InvalidRange { .. }
            | Self::MalformedSelection { .. }
            | Self::MalformedSamples { .. } => "validation",
            Self::NoMatchingCurve { .. } => "host",
            Self::NumericDegeneracy { .. } => "numeric",
            Self::SpanTableTooLarge { .. } => "resources",
        }
    }
}
