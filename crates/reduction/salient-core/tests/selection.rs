use salient_core::{
    format_report, parse_report, select, select_set, span_error, ErrorMetric, ReductionError,
    Samples, SelectConfig, SelectionSet,
};
use salient_test_fixtures::{curves, SampledCurve};

fn fixture(name: &str) -> SampledCurve {
    curves::sampled(name).expect("fixture should load")
}

fn run(curve: &SampledCurve, max_keyframes: usize, cfg: &SelectConfig) -> SelectionSet {
    select_set(curve.start, curve.end, max_keyframes, &curve.samples, cfg).unwrap()
}

#[test]
fn ramp_is_reproduced_with_zero_error() {
    let ramp = fixture("ramp");
    let set = run(&ramp, 5, &SelectConfig::default());
    assert_eq!(set.min_keyframes(), Some(3));
    assert_eq!(set.max_keyframes(), Some(5));
    for result in &set {
        assert!(result.error.abs() < 1e-9, "n={} error={}", result.n, result.error);
    }

    let report = select(ramp.start, ramp.end, 5, &ramp.samples).unwrap();
    assert_eq!(report.lines().count(), 3);
    assert!(report.lines().all(|l| l.starts_with("0.0000|")), "{report}");
}

#[test]
fn spike_becomes_a_keyframe() {
    let spike = fixture("spike");
    let set = run(&spike, 7, &SelectConfig::default());
    assert_eq!(set.len(), 5);
    assert_eq!(set.selection_by_keyframes(3), Some(&[0, 3, 6][..]));
    assert!(set.error_by_keyframes(3).unwrap() < 1e-9);
    assert_eq!(set.selection_by_keyframes(7), Some(&[0, 1, 2, 3, 4, 5, 6][..]));
    assert_eq!(set.error_by_keyframes(7), Some(0.0));

    // Leaving the spike out of a span costs something.
    let samples = Samples::from_curve(spike.samples.clone()).unwrap();
    let skipped = span_error(&samples, 2, 6, ErrorMetric::Curve).unwrap()
        + span_error(&samples, 0, 2, ErrorMetric::Curve).unwrap();
    assert!(skipped > 1.0, "skipped={skipped}");
}

#[test]
fn selections_are_anchored_and_sized() {
    let sine = fixture("sine");
    let set = run(&sine, 10, &SelectConfig::default());
    let last = sine.frames() - 1;
    for result in &set {
        assert_eq!(result.selection.len(), result.n);
        assert_eq!(result.selection.first(), Some(&0));
        assert_eq!(result.selection.last(), Some(&last));
        assert!(result.selection.windows(2).all(|p| p[0] < p[1]));
    }
}

#[test]
fn error_does_not_grow_with_more_keyframes() {
    let sine = fixture("sine");
    let set = run(&sine, 10, &SelectConfig::default());
    let errors: Vec<f64> = set.iter().map(|r| r.error).collect();
    assert!(errors[0] > 1.0, "three keys cannot follow two sine periods");
    for pair in errors.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-9 * pair[0].max(1.0), "{errors:?}");
    }
}

/// Small deterministic generator so noisy inputs are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

#[test]
fn curve_error_does_not_grow_on_noisy_inputs() {
    for seed in 0..64u64 {
        let mut rng = Lcg(seed);
        let frames = 8 + (seed % 13) as usize;
        let data: Vec<f64> = (0..frames).map(|_| rng.next_f64() * 40.0 - 20.0).collect();
        let set = select_set(0, frames as i64 - 1, frames, &data, &SelectConfig::default())
            .unwrap();
        let errors: Vec<f64> = set.iter().map(|r| r.error).collect();
        assert_eq!(errors.len(), frames - 2);
        for pair in errors.windows(2) {
            assert!(
                pair[1] <= pair[0] + 1e-9 * pair[0].max(1.0),
                "seed {seed}: {errors:?}"
            );
        }
    }
}

/// Smallest summed line error over every selection of `n` frames anchored at
/// both ends.
fn exhaustive_line_error(samples: &Samples, n: usize) -> f64 {
    let last = samples.frames() - 1;
    let interior = last - 1;
    let mut best = f64::INFINITY;
    for mask in 0u32..(1 << interior) {
        if mask.count_ones() as usize != n - 2 {
            continue;
        }
        let mut frames = vec![0];
        frames.extend((0..interior).filter(|b| mask & (1 << b) != 0).map(|b| b + 1));
        frames.push(last);
        let total: f64 = frames
            .windows(2)
            .map(|p| span_error(samples, p[0], p[1], ErrorMetric::Line).unwrap())
            .sum();
        best = best.min(total);
    }
    best
}

#[test]
fn line_error_reports_the_exact_optimum_even_when_it_rises() {
    // Chord errors are pinned at the keyframes, so one more keyframe can
    // force a worse optimum.
    let data = [14.0, -5.0, 18.0, -10.0, 7.0, -17.0, 15.0, -19.0];
    let cfg = SelectConfig {
        metric: ErrorMetric::Line,
        ..SelectConfig::default()
    };
    let set = select_set(0, 7, 8, &data, &cfg).unwrap();
    let samples = Samples::from_curve(data.to_vec()).unwrap();
    for result in &set {
        let best = exhaustive_line_error(&samples, result.n);
        assert!(
            (result.error - best).abs() <= 1e-9 * best.max(1.0),
            "n={}: {} vs {best}",
            result.n,
            result.error
        );
    }

    let six = set.error_by_keyframes(6).unwrap();
    let seven = set.error_by_keyframes(7).unwrap();
    assert!((six - 418.8889).abs() < 1e-3, "{six}");
    assert!((seven - 420.25).abs() < 1e-3, "{seven}");
    assert!(seven > six);
    assert_eq!(set.error_by_keyframes(8), Some(0.0));
}

#[test]
fn keyframe_count_equal_to_frames_has_zero_error() {
    let hold = fixture("step-hold");
    let frames = hold.frames();
    let set = run(&hold, frames, &SelectConfig::default());
    assert_eq!(set.error_by_keyframes(frames), Some(0.0));
    let all: Vec<usize> = (0..frames).collect();
    assert_eq!(set.selection_by_keyframes(frames), Some(all.as_slice()));
}

#[test]
fn oversized_max_keyframes_is_clamped() {
    let ramp = fixture("ramp");
    let set = run(&ramp, 50, &SelectConfig::default());
    assert_eq!(set.max_keyframes(), Some(ramp.frames()));
}

#[test]
fn channels_share_one_selection() {
    let arm = fixture("arm-translate");
    assert_eq!(arm.dims, 2);
    let set = run(&arm, 5, &SelectConfig::default());
    let samples = Samples::from_interleaved(arm.samples.clone(), arm.frames()).unwrap();
    assert_eq!(samples.dims(), 2);
    for result in &set {
        let total: f64 = result
            .selection
            .windows(2)
            .map(|p| span_error(&samples, p[0], p[1], ErrorMetric::Curve).unwrap())
            .sum();
        assert!(
            (total - result.error).abs() <= 1e-9 * total.max(1.0),
            "n={} total={total} reported={}",
            result.n,
            result.error
        );
    }
}

#[test]
fn fixed_keyframes_are_always_selected() {
    let sine = fixture("sine");
    let cfg = SelectConfig {
        fixed_keyframes: vec![10, 30],
        ..SelectConfig::default()
    };
    let set = run(&sine, 8, &cfg);
    assert_eq!(set.min_keyframes(), Some(4));
    assert_eq!(set.selection_by_keyframes(4), Some(&[0, 10, 30, 48][..]));
    for result in &set {
        assert!(result.selection.contains(&10), "{:?}", result.selection);
        assert!(result.selection.contains(&30), "{:?}", result.selection);
    }
}

#[test]
fn extremes_then_breakdowns() {
    let hold = fixture("step-hold");
    let extremes_cfg = SelectConfig {
        metric: ErrorMetric::Line,
        ..SelectConfig::default()
    };
    let extremes = run(&hold, 4, &extremes_cfg);
    let poses = extremes.selection_by_keyframes(4).unwrap().to_vec();

    let breakdowns_cfg = SelectConfig {
        metric: ErrorMetric::Curve,
        fixed_keyframes: poses.clone(),
        ..SelectConfig::default()
    };
    let breakdowns = run(&hold, 8, &breakdowns_cfg);
    assert_eq!(breakdowns.min_keyframes(), Some(4));
    for result in &breakdowns {
        for pose in &poses {
            assert!(result.selection.contains(pose), "{:?} lacks {pose}", result.selection);
        }
    }
}

#[test]
fn invalid_ranges_fail_without_output() {
    let spike = fixture("spike");
    let cfg = SelectConfig::default();
    for err in [
        select(0, 6, 2, &spike.samples).unwrap_err(),
        select(6, 0, 3, &spike.samples).unwrap_err(),
        select(0, 1, 3, &[0.0, 1.0]).unwrap_err(),
    ] {
        assert!(matches!(err, ReductionError::InvalidRange { .. }), "{err}");
    }

    let err = select(0, 6, 3, &spike.samples[..6]).unwrap_err();
    assert!(matches!(err, ReductionError::MalformedSamples { .. }), "{err}");

    let out_of_range = SelectConfig {
        fixed_keyframes: vec![7],
        ..cfg.clone()
    };
    let err = select_set(0, 6, 3, &spike.samples, &out_of_range).unwrap_err();
    assert!(matches!(err, ReductionError::InvalidRange { .. }), "{err}");

    let crowded = SelectConfig {
        fixed_keyframes: vec![1, 2, 3, 4],
        ..cfg
    };
    let err = select_set(0, 6, 5, &spike.samples, &crowded).unwrap_err();
    assert!(matches!(err, ReductionError::InvalidRange { .. }), "{err}");
}

#[test]
fn overflowing_frame_ranges_are_invalid() {
    let err = select(i64::MIN, i64::MAX, 3, &[0.0; 3]).unwrap_err();
    assert!(matches!(err, ReductionError::InvalidRange { .. }), "{err}");
}

#[test]
fn oversized_ranges_fail_fast() {
    let cfg = SelectConfig {
        max_table_frames: 16,
        ..SelectConfig::default()
    };
    let err = select_set(0, 19, 3, &[0.0; 20], &cfg).unwrap_err();
    assert_eq!(
        err,
        ReductionError::SpanTableTooLarge {
            frames: 20,
            limit: 16
        }
    );
}

#[test]
fn report_parses_back() {
    let sine = fixture("sine");
    let set = run(&sine, 6, &SelectConfig::default());
    let parsed = parse_report(&format_report(&set)).unwrap();
    assert_eq!(parsed.len(), set.len());
    for (back, original) in parsed.iter().zip(&set) {
        assert_eq!(back.n, original.n);
        assert_eq!(back.selection, original.selection);
        assert!((back.error - original.error).abs() <= 5e-5);
    }
}
