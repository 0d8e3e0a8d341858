//! Salient keyframe selection and curve reduction (host-agnostic).
//!
//! Dense per-frame samples go in; the crate reports, for every keyframe count,
//! the frames that minimise the total cubic fitting error, and fits one pinned
//! cubic Bézier per consecutive keyframe pair for a chosen selection. Host
//! animation curves are reached only through the adapter traits in [`host`].

pub mod commands;
pub mod config;
pub mod cubic;
pub mod error;
pub mod error_table;
pub mod fit;
pub mod host;
pub mod interpolator;
pub mod samples;
pub mod selector;

// Re-exports for consumers (adapters)
pub use commands::{
    export_selections_json, format_report, parse_report, reduce, select, select_set,
    select_with_config, CommandArg, ReduceCommand, SelectCommand, REDUCE_COMMAND, SELECT_COMMAND,
};
pub use config::{default_max_keyframes, AngleUnit, ErrorMetric, SamplerConfig, SelectConfig};
pub use cubic::{Cubic, Tangent, Vec2};
pub use error::{ReductionError, Result};
pub use error_table::ErrorTable;
pub use fit::span_error;
pub use host::{
    reduce_attribute, sample_attributes, sample_curve, select_attributes, AttributePath,
    CurveSet, CurveSource, CurveWriter, Key, KeyedCurve,
};
pub use interpolator::{optimal, optimal_for_values};
pub use samples::{validate_selection, Samples};
pub use selector::{up_to_n, up_to_n_with_fixed, SelectionResult, SelectionSet};
