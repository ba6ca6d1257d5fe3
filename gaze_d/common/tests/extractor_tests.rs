mod support;

use api::{EyeLandmarks, LandmarkFrame};
use common::config::ExtractorConfig;
use common::{ExtractError, GazeExtractor};
use glam::Vec2;
use support::{approx, frame_with_gaze};

const WEIGHTS: [f32; 5] = [0.0, 0.5, 0.8, 0.85, 1.0];

fn extractor(weight: f32) -> GazeExtractor {
    GazeExtractor::new(&ExtractorConfig {
        head_pose_weight: weight,
    })
}

#[test]
fn test_short_frame_is_rejected() {
    let frame = LandmarkFrame::new(vec![Vec2::splat(0.5); 100], 0);
    let err = extractor(0.5).extract(&frame).unwrap_err();
    assert_eq!(
        err,
        ExtractError::InsufficientLandmarks {
            found: 100,
            required: 478
        }
    );

    assert!(extractor(0.5).extract(&LandmarkFrame::empty(0)).is_err());
}

#[test]
fn test_centered_iris_and_face_give_center_for_any_weight() {
    let frame = frame_with_gaze(Vec2::splat(0.5), Vec2::splat(0.5), 0);
    for w in WEIGHTS {
        let raw = extractor(w).extract(&frame).unwrap();
        assert!(approx(raw.x, 0.5, 1e-4), "w={} x={}", w, raw.x);
        assert!(approx(raw.y, 0.5, 1e-4), "w={} y={}", w, raw.y);
    }
}

#[test]
fn test_blend_follows_head_pose_weight() {
    // Iris at the low corner and top lid of both eyes: mirrored iris gaze is (1, 1).
    let face = Vec2::new(0.3, 0.6);
    let frame = frame_with_gaze(Vec2::ZERO, face, 0);
    let head = Vec2::new(1.0 - face.x, face.y);

    for w in WEIGHTS {
        let raw = extractor(w).extract(&frame).unwrap();
        let expected = Vec2::ONE * (1.0 - w) + head * w;
        assert!(approx(raw.x, expected.x, 1e-4), "w={} x={}", w, raw.x);
        assert!(approx(raw.y, expected.y, 1e-4), "w={} y={}", w, raw.y);
    }
}

#[test]
fn test_iris_outside_eye_is_clamped() {
    let frame = frame_with_gaze(Vec2::new(1.8, -0.7), Vec2::splat(0.5), 0);
    let raw = extractor(0.0).extract(&frame).unwrap();
    assert!(approx(raw.x, 0.0, 1e-6));
    assert!(approx(raw.y, 1.0, 1e-6));
}

#[test]
fn test_closed_eye_gives_neutral_vertical() {
    let mut frame = frame_with_gaze(Vec2::new(0.5, 0.0), Vec2::splat(0.5), 0);
    for eye in [EyeLandmarks::LEFT, EyeLandmarks::RIGHT] {
        let top = frame.points[eye.lid_top];
        frame.points[eye.lid_bottom] = top + Vec2::new(0.0, 0.0005);
    }
    let raw = extractor(0.0).extract(&frame).unwrap();
    assert!(approx(raw.y, 0.5, 1e-6), "y={}", raw.y);
}

#[test]
fn test_nan_landmarks_give_invalid_sample() {
    let mut frame = frame_with_gaze(Vec2::splat(0.5), Vec2::splat(0.5), 0);
    frame.points[1] = Vec2::new(f32::NAN, 0.5);
    assert_eq!(
        extractor(0.5).extract(&frame).unwrap_err(),
        ExtractError::InvalidSample
    );

    let mut frame = frame_with_gaze(Vec2::splat(0.5), Vec2::splat(0.5), 0);
    frame.points[EyeLandmarks::LEFT.iris_center] = Vec2::splat(f32::NAN);
    assert_eq!(
        extractor(0.0).extract(&frame).unwrap_err(),
        ExtractError::InvalidSample
    );
}

#[test]
fn test_weight_is_clamped() {
    let mut ex = extractor(3.0);
    assert_eq!(ex.head_pose_weight(), 1.0);
    ex.set_head_pose_weight(-1.0);
    assert_eq!(ex.head_pose_weight(), 0.0);
}
