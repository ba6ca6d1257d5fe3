mod support;

use common::config::{FilterConfig, StabilityConfig};
use common::{HistoryBuffer, MotionClass, StabilityStage};
use glam::Vec2;
use support::approx;

const TICK_MS: u64 = 33;

fn stage() -> StabilityStage {
    StabilityStage::new(&StabilityConfig::default(), &FilterConfig::default())
}

/// Feeds `values` on the x axis (y fixed at 0.5) one tick apart, starting at `start_ms`.
fn feed_x(stage: &mut StabilityStage, values: &[f32], start_ms: u64) -> u64 {
    let mut t = start_ms;
    for &x in values {
        stage.process(Vec2::new(x, 0.5), t);
        t += TICK_MS;
    }
    t
}

fn alternating(n: usize) -> Vec<f32> {
    (0..n).map(|i| if i % 2 == 0 { 0.49 } else { 0.51 }).collect()
}

#[test]
fn test_history_buffer_evicts_oldest() {
    let mut history = HistoryBuffer::new(10);
    for i in 0..25 {
        history.push(Vec2::splat(i as f32));
        assert!(history.len() <= 10);
    }
    assert_eq!(history.len(), 10);
    assert_eq!(history.iter().next().copied(), Some(Vec2::splat(15.0)));
}

#[test]
fn test_history_mean_and_std_dev() {
    let mut history = HistoryBuffer::new(10);
    assert!(history.mean_std_dev().is_none());
    for x in alternating(10) {
        history.push(Vec2::new(x, 0.5));
    }
    let (mean, std_dev) = history.mean_std_dev().unwrap();
    assert!(approx(mean.x, 0.5, 1e-5));
    assert!(approx(std_dev.x, 0.01, 1e-5));
    assert!(approx(std_dev.y, 0.0, 1e-6));
}

#[test]
fn test_outlier_check_waits_for_history() {
    let mut s = stage();
    assert!(s.process(Vec2::new(0.5, 0.5), 0).is_some());
    assert!(s.process(Vec2::new(0.51, 0.5), 33).is_some());
    // Two samples only: even a wild value is accepted.
    assert!(!s.is_outlier(Vec2::new(5.0, 5.0)));
    assert!(s.process(Vec2::new(0.95, 0.05), 66).is_some());
}

#[test]
fn test_flat_history_cannot_reject() {
    let mut s = stage();
    feed_x(&mut s, &[0.5; 9], 0);
    assert!(!s.is_outlier(Vec2::new(0.9, 0.1)));
    assert!(s.process(Vec2::new(0.9, 0.1), 1_000).is_some());
}

#[test]
fn test_four_sigma_sample_is_rejected() {
    let mut s = stage();
    let t = feed_x(&mut s, &alternating(10), 0);
    assert_eq!(s.history().len(), 10);

    let before = s.smoothed();
    assert!(s.is_outlier(Vec2::new(0.54, 0.5)));
    assert!(s.process(Vec2::new(0.54, 0.5), t).is_none());
    assert_eq!(s.smoothed(), before, "rejected sample must not move the output");
    assert_eq!(s.history().len(), 10);

    // Two sigma is fine.
    assert!(s.process(Vec2::new(0.52, 0.5), t + TICK_MS).is_some());
}

#[test]
fn test_rejected_frame_still_advances_clock() {
    let mut s = stage();
    let t = feed_x(&mut s, &alternating(10), 0);
    let last_accepted_ms = t - TICK_MS;

    assert!(s.process(Vec2::new(0.60, 0.5), last_accepted_ms + 2_000).is_none());

    // 0.01 away from the last accepted 0.51, 100ms after the rejected frame.
    assert!(s.process(Vec2::new(0.50, 0.5), last_accepted_ms + 2_100).is_some());
    assert_eq!(s.last_motion(), Some(MotionClass::Saccade));
}

#[test]
fn test_steady_gaze_converges_and_fixates() {
    let mut s = stage();
    let target = Vec2::new(0.6, 0.45);
    let mut out = None;
    for i in 0..15u64 {
        out = s.process(target, i * TICK_MS);
        if i >= 1 {
            assert_eq!(s.last_motion(), Some(MotionClass::Fixation), "tick {}", i);
        }
    }
    let out = out.unwrap();
    assert!((out.x - target.x).abs() <= target.x * 0.01, "x={}", out.x);
    assert!((out.y - target.y).abs() <= target.y * 0.01, "y={}", out.y);
}

#[test]
fn test_jump_selects_saccade_factor() {
    let mut s = stage();
    let t = feed_x(&mut s, &[0.5; 10], 0);
    assert_eq!(s.last_motion(), Some(MotionClass::Fixation));

    let before = s.smoothed().unwrap();
    assert!(s.process(Vec2::new(0.7, 0.5), t).is_some());
    assert_eq!(s.last_motion(), Some(MotionClass::Saccade));
    assert!(s.smoothed().unwrap().x > before.x);
    assert_eq!(s.smoothing_factor(MotionClass::Saccade), 0.25);
}

#[test]
fn test_moderate_motion_uses_midpoint_factor() {
    let mut s = stage();
    let t = feed_x(&mut s, &[0.5; 5], 0);
    // 0.001 over 33ms is ~0.03/s: between fixation and saccade.
    s.process(Vec2::new(0.501, 0.5), t);
    assert_eq!(s.last_motion(), Some(MotionClass::Intermediate));
    assert!(approx(s.smoothing_factor(MotionClass::Intermediate), 0.165, 1e-6));
}

#[test]
fn test_classify_thresholds() {
    let s = stage();
    assert_eq!(s.classify(0.0), MotionClass::Fixation);
    assert_eq!(s.classify(0.0149), MotionClass::Fixation);
    assert_eq!(s.classify(0.015), MotionClass::Intermediate);
    assert_eq!(s.classify(0.05), MotionClass::Intermediate);
    assert_eq!(s.classify(0.0501), MotionClass::Saccade);
}

#[test]
fn test_reset_clears_session_state() {
    let mut s = stage();
    feed_x(&mut s, &[0.3; 6], 0);
    s.reset();
    assert!(s.smoothed().is_none());
    assert!(s.history().is_empty());
    assert_eq!(s.filters().0.current(), 0.5);
    assert_eq!(s.filters().1.error_covariance(), 1.0);
}
