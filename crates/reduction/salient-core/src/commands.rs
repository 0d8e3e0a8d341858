//! Select / Reduce as plain functions, their text report, and positional
//! argument framing for command hosts.

use std::fmt::Write as _;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::config::{ErrorMetric, SelectConfig};
use crate::error::{ReductionError, Result};
use crate::error_table::ErrorTable;
use crate::interpolator;
use crate::samples::Samples;
use crate::selector::{self, SelectionResult, SelectionSet};

pub const SELECT_COMMAND: &str = "salientSelect";
pub const REDUCE_COMMAND: &str = "salientReduce";

/// Run selection over `[start, end]` and render the text report.
pub fn select(start: i64, end: i64, max_keyframes: usize, data: &[f64]) -> Result<String> {
    select_with_config(start, end, max_keyframes, data, &SelectConfig::default())
}

pub fn select_with_config(
    start: i64,
    end: i64,
    max_keyframes: usize,
    data: &[f64],
    cfg: &SelectConfig,
) -> Result<String> {
    let set = select_set(start, end, max_keyframes, data, cfg)?;
    Ok(format_report(&set))
}

/// Structured form of [`select_with_config`]. `data` is the flat frame-major
/// sample matrix; its channel count is `data.len() / (end - start + 1)`.
pub fn select_set(
    start: i64,
    end: i64,
    max_keyframes: usize,
    data: &[f64],
    cfg: &SelectConfig,
) -> Result<SelectionSet> {
    if end < start {
        return Err(ReductionError::range(format!(
            "end frame {end} is before start frame {start}"
        )));
    }
    let frames = end
        .checked_sub(start)
        .and_then(|d| d.checked_add(1))
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ReductionError::range(format!("frame range [{start}, {end}] is too long")))?;
    if frames < 3 {
        return Err(ReductionError::range(format!(
            "at least 3 frames are required for selection (got {frames})"
        )));
    }
    if max_keyframes < 3 {
        return Err(ReductionError::range(format!(
            "max keyframes must be at least 3 (got {max_keyframes})"
        )));
    }
    let samples = Samples::from_interleaved(data.to_vec(), frames)?;
    debug!(
        "select [{start}, {end}]: {} channels, up to {max_keyframes} keyframes",
        samples.dims()
    );
    let table = ErrorTable::with_config(&samples, cfg)?;
    selector::up_to_n_with_fixed(frames, max_keyframes, &samples, &table, &cfg.fixed_keyframes)
}

/// Fit one cubic per consecutive keyframe pair and flatten them, eight values
/// per cubic. Keyframes index into `samples`.
pub fn reduce(samples: &[f64], keyframes: &[usize]) -> Result<Vec<f64>> {
    let cubics = interpolator::optimal_for_values(samples, keyframes)?;
    Ok(cubics.iter().flat_map(|c| c.to_array()).collect())
}

/// One line per result: `"<error>|<i0>,<i1>,...\n"`, error with 4 decimals.
pub fn format_report(set: &SelectionSet) -> String {
    let mut out = String::new();
    for result in set {
        let _ = write!(out, "{:.4}|", result.error);
        for (k, frame) in result.selection.iter().enumerate() {
            if k > 0 {
                out.push(',');
            }
            let _ = write!(out, "{frame}");
        }
        out.push('\n');
    }
    out
}

/// Parse a report produced by [`format_report`]. Blank lines are skipped.
pub fn parse_report(report: &str) -> Result<Vec<SelectionResult>> {
    let mut results = Vec::new();
    for (line_no, line) in report.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (error, frames) = line.split_once('|').ok_or_else(|| {
            ReductionError::selection(format!("report line {} has no '|' separator", line_no + 1))
        })?;
        let error: f64 = error.trim().parse().map_err(|_| {
            ReductionError::selection(format!(
                "report line {} has a bad error value '{error}'",
                line_no + 1
            ))
        })?;
        let selection = frames
            .split(',')
            .map(|f| f.trim().parse::<usize>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| {
                ReductionError::selection(format!(
                    "report line {} has a bad frame list '{frames}'",
                    line_no + 1
                ))
            })?;
        results.push(SelectionResult {
            n: selection.len(),
            error,
            selection,
        });
    }
    Ok(results)
}

/// Selections as JSON for structured consumers; frames are made absolute
/// against `start`.
pub fn export_selections_json(set: &SelectionSet, start: i64) -> JsonValue {
    let results: Vec<JsonValue> = set
        .iter()
        .map(|r| {
            json!({
                "keyframes": r.n,
                "error": r.error,
                "selection": r.selection,
                "frames": r.absolute_frames(start),
            })
        })
        .collect();
    json!({ "start": start, "results": results })
}

/// Positional argument as handed over by a command host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandArg {
    Int(i64),
    Float(f64),
    List(Vec<f64>),
    Text(String),
}

impl From<i64> for CommandArg {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for CommandArg {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Vec<f64>> for CommandArg {
    fn from(v: Vec<f64>) -> Self {
        Self::List(v)
    }
}

impl From<&str> for CommandArg {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

fn bad_arg(command: &str, index: usize, reason: impl Into<String>) -> ReductionError {
    ReductionError::InvalidArgument {
        command: command.to_string(),
        index,
        reason: reason.into(),
    }
}

fn int_arg(command: &str, args: &[CommandArg], index: usize) -> Result<i64> {
    match &args[index] {
        CommandArg::Int(v) => Ok(*v),
        CommandArg::Float(v) if v.fract() == 0.0 && v.is_finite() => Ok(*v as i64),
        other => Err(bad_arg(command, index, format!("must be an integer, got {other:?}"))),
    }
}

fn count_arg(command: &str, args: &[CommandArg], index: usize) -> Result<usize> {
    let v = int_arg(command, args, index)?;
    usize::try_from(v).map_err(|_| bad_arg(command, index, format!("must not be negative, got {v}")))
}

fn list_arg(command: &str, args: &[CommandArg], index: usize) -> Result<Vec<f64>> {
    match &args[index] {
        CommandArg::List(v) => Ok(v.clone()),
        other => Err(bad_arg(command, index, format!("must be a number list, got {other:?}"))),
    }
}

fn index_list_arg(command: &str, args: &[CommandArg], index: usize) -> Result<Vec<usize>> {
    list_arg(command, args, index)?
        .into_iter()
        .map(|v| {
            if v.is_finite() && v.fract() == 0.0 && v >= 0.0 {
                Ok(v as usize)
            } else {
                Err(bad_arg(command, index, format!("must hold frame indices, got {v}")))
            }
        })
        .collect()
}

/// `salientSelect` arguments.
///
/// Accepts `(start, end, maxKeyframes, data)` or the extended
/// `(metric, start, end, maxKeyframes, fixedKeyframes, data)`.
#[derive(Clone, Debug)]
pub struct SelectCommand {
    pub start: i64,
    pub end: i64,
    pub max_keyframes: usize,
    pub data: Vec<f64>,
    pub config: SelectConfig,
}

impl SelectCommand {
    pub fn from_args(args: &[CommandArg]) -> Result<Self> {
        let name = SELECT_COMMAND;
        match args.len() {
            4 => Ok(Self {
                start: int_arg(name, args, 0)?,
                end: int_arg(name, args, 1)?,
                max_keyframes: count_arg(name, args, 2)?,
                data: list_arg(name, args, 3)?,
                config: SelectConfig::default(),
            }),
            6 => {
                let metric = match &args[0] {
                    CommandArg::Text(t) => t
                        .parse::<ErrorMetric>()
                        .map_err(|reason| bad_arg(name, 0, reason))?,
                    other => {
                        return Err(bad_arg(name, 0, format!("must be a metric name, got {other:?}")))
                    }
                };
                Ok(Self {
                    start: int_arg(name, args, 1)?,
                    end: int_arg(name, args, 2)?,
                    max_keyframes: count_arg(name, args, 3)?,
                    data: list_arg(name, args, 5)?,
                    config: SelectConfig {
                        metric,
                        fixed_keyframes: index_list_arg(name, args, 4)?,
                        ..SelectConfig::default()
                    },
                })
            }
            actual => Err(ReductionError::InvalidArgumentCount {
                command: name.to_string(),
                expected: "4 or 6".to_string(),
                actual,
            }),
        }
    }

    pub fn run(&self) -> Result<String> {
        select_with_config(
            self.start,
            self.end,
            self.max_keyframes,
            &self.data,
            &self.config,
        )
    }
}

/// `salientReduce` arguments: `(samples, keyframeIndices)`.
#[derive(Clone, Debug)]
pub struct ReduceCommand {
    pub samples: Vec<f64>,
    pub keyframes: Vec<usize>,
}

impl ReduceCommand {
    pub fn from_args(args: &[CommandArg]) -> Result<Self> {
        let name = REDUCE_COMMAND;
        if args.len() != 2 {
            return Err(ReductionError::InvalidArgumentCount {
                command: name.to_string(),
                expected: "2".to_string(),
                actual: args.len(),
            });
        }
        Ok(Self {
            samples: list_arg(name, args, 0)?,
            keyframes: index_list_arg(name, args, 1)?,
        })
    }

    pub fn run(&self) -> Result<Vec<f64>> {
        reduce(&self.samples, &self.keyframes)
    }
}
