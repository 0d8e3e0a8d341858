//! Optimal keyframe selection for every keyframe count.
//!
//! Interval-partition dynamic program over the span error table:
//! - `cost[k][j]`: minimal total error covering `[0, j]` with exactly `k` spans
//!   whose last boundary is frame `j`
//! - `cost[1][j] = error(0, j)`
//! - `cost[k][j] = min_{i<j} cost[k-1][i] + error(i, j)`
//!
//! The selection with `n = k + 1` keyframes is recovered by backtracking from
//! `cost[k][L-1]`. Ties go to the smallest `i`.
//!
//! Fixed keyframes act as barriers: a span may end on a fixed keyframe but never
//! jump over one, so every finite-cost path passes through all of them.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ReductionError, Result};
use crate::error_table::ErrorTable;
use crate::samples::Samples;

const NO_PARENT: usize = usize::MAX;

/// Best selection for one keyframe count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Number of keyframes (`selection.len()`).
    pub n: usize,
    /// Sum of the span errors induced by `selection`.
    pub error: f64,
    /// Strictly increasing frame offsets, first 0 and last `frames - 1`.
    pub selection: Vec<usize>,
}

impl SelectionResult {
    /// Selection as absolute frames for a range starting at `start`.
    pub fn absolute_frames(&self, start: i64) -> Vec<i64> {
        self.selection.iter().map(|&f| start + f as i64).collect()
    }
}

/// Selection results ordered by increasing keyframe count.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionSet {
    results: Vec<SelectionResult>,
}

impl SelectionSet {
    pub fn get(&self, n: usize) -> Option<&SelectionResult> {
        self.results
            .binary_search_by_key(&n, |r| r.n)
            .ok()
            .map(|at| &self.results[at])
    }

    pub fn selection_by_keyframes(&self, n: usize) -> Option<&[usize]> {
        self.get(n).map(|r| r.selection.as_slice())
    }

    pub fn error_by_keyframes(&self, n: usize) -> Option<f64> {
        self.get(n).map(|r| r.error)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SelectionResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Smallest keyframe count with a result.
    pub fn min_keyframes(&self) -> Option<usize> {
        self.results.first().map(|r| r.n)
    }

    /// Largest keyframe count with a result.
    pub fn max_keyframes(&self) -> Option<usize> {
        self.results.last().map(|r| r.n)
    }

    pub fn into_vec(self) -> Vec<SelectionResult> {
        self.results
    }
}

impl<'a> IntoIterator for &'a SelectionSet {
    type Item = &'a SelectionResult;
    type IntoIter = std::slice::Iter<'a, SelectionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Best selection for every keyframe count `3..=max_keyframes`.
pub fn up_to_n(
    total_frames: usize,
    max_keyframes: usize,
    samples: &Samples,
    table: &ErrorTable,
) -> Result<SelectionSet> {
    up_to_n_with_fixed(total_frames, max_keyframes, samples, table, &[])
}

/// Like [`up_to_n`], with frame offsets that every selection must contain.
/// Keyframe counts too small to hold all anchors are left out of the result.
pub fn up_to_n_with_fixed(
    total_frames: usize,
    max_keyframes: usize,
    samples: &Samples,
    table: &ErrorTable,
    fixed: &[usize],
) -> Result<SelectionSet> {
    if total_frames < 3 {
        return Err(ReductionError::range(format!(
            "at least 3 frames are required for selection (got {total_frames})"
        )));
    }
    if max_keyframes < 3 {
        return Err(ReductionError::range(format!(
            "max keyframes must be at least 3 (got {max_keyframes})"
        )));
    }
    if samples.frames() != total_frames || table.frames() != total_frames {
        return Err(ReductionError::range(format!(
            "{total_frames} frames requested but {} were sampled and {} tabulated",
            samples.frames(),
            table.frames()
        )));
    }
    if let Some(&bad) = fixed.iter().find(|&&f| f >= total_frames) {
        return Err(ReductionError::range(format!(
            "fixed keyframe {bad} is outside the {total_frames} frame range"
        )));
    }

    let frames = total_frames;
    let max_n = if max_keyframes > frames {
        debug!("clamping max keyframes {max_keyframes} to the {frames} available frames");
        frames
    } else {
        max_keyframes
    };
    let max_spans = max_n - 1;
    let next_anchor = next_anchors(frames, fixed);

    let width = frames;
    let mut cost = vec![f64::INFINITY; (max_spans + 1) * width];
    let mut parent = vec![NO_PARENT; (max_spans + 1) * width];

    for j in 1..=next_anchor[0] {
        cost[width + j] = table.get(0, j);
        parent[width + j] = 0;
    }
    for k in 2..=max_spans {
        let (done, row) = cost.split_at_mut(k * width);
        let prev = &done[(k - 1) * width..];
        let row = &mut row[..width];
        for j in k..frames {
            let mut best = f64::INFINITY;
            let mut arg = NO_PARENT;
            for i in (k - 1)..j {
                let base = prev[i];
                if !base.is_finite() || j > next_anchor[i] {
                    continue;
                }
                let candidate = base + table.get(i, j);
                if candidate < best {
                    best = candidate;
                    arg = i;
                }
            }
            row[j] = best;
            parent[k * width + j] = arg;
        }
    }

    let last = frames - 1;
    let mut results = Vec::with_capacity(max_spans.saturating_sub(1));
    for k in 2..=max_spans {
        let error = cost[k * width + last];
        if !error.is_finite() {
            continue;
        }
        let mut selection = Vec::with_capacity(k + 1);
        let mut j = last;
        selection.push(j);
        for kk in (1..=k).rev() {
            j = parent[kk * width + j];
            selection.push(j);
        }
        selection.reverse();
        debug_assert_eq!(selection[0], 0);
        results.push(SelectionResult {
            n: k + 1,
            error,
            selection,
        });
    }

    if results.is_empty() {
        return Err(ReductionError::range(format!(
            "no selection of at most {max_n} keyframes contains all {} anchors",
            count_anchors(frames, fixed)
        )));
    }
    warn_on_non_monotonic(&results);

    Ok(SelectionSet { results })
}

/// For every frame `i`, the first anchor (fixed keyframe or last frame) after it.
fn next_anchors(frames: usize, fixed: &[usize]) -> Vec<usize> {
    let last = frames - 1;
    let mut is_anchor = vec![false; frames];
    is_anchor[last] = true;
    for &f in fixed {
        is_anchor[f] = true;
    }
    let mut next = vec![last; frames];
    let mut upcoming = last;
    for i in (0..last).rev() {
        next[i] = upcoming;
        if is_anchor[i] {
            upcoming = i;
        }
    }
    next
}

fn count_anchors(frames: usize, fixed: &[usize]) -> usize {
    let mut anchors: Vec<usize> = fixed.to_vec();
    anchors.push(0);
    anchors.push(frames - 1);
    anchors.sort_unstable();
    anchors.dedup();
    anchors.len()
}

fn warn_on_non_monotonic(results: &[SelectionResult]) {
    for pair in results.windows(2) {
        let (fewer, more) = (&pair[0], &pair[1]);
        let tolerance = 1e-9 * fewer.error.abs().max(1.0);
        if more.n == fewer.n + 1 && more.error > fewer.error + tolerance {
            warn!(
                "selection error rose from {} ({} keyframes) to {} ({} keyframes)",
                fewer.error, fewer.n, more.error, more.n
            );
        }
    }
}
