#![allow(dead_code)]

use api::{EyeLandmarks, LandmarkFrame, FACE_MESH_POINTS};
use glam::Vec2;

/// Eye geometry for a synthetic frame: iris position inside the eye opening, per axis in [0, 1].
pub fn frame_with_gaze(iris: Vec2, face_center: Vec2, timestamp_ms: u64) -> LandmarkFrame {
    let mut points = vec![Vec2::splat(0.5); FACE_MESH_POINTS];
    place_eye(&mut points, &EyeLandmarks::RIGHT, Vec2::new(0.30, 0.40), iris);
    place_eye(&mut points, &EyeLandmarks::LEFT, Vec2::new(0.60, 0.40), iris);
    points[1] = face_center;
    LandmarkFrame::new(points, timestamp_ms)
}

fn place_eye(points: &mut [Vec2], eye: &EyeLandmarks, origin: Vec2, iris: Vec2) {
    let size = Vec2::new(0.10, 0.04);
    points[eye.corner_min] = Vec2::new(origin.x, origin.y + size.y * 0.5);
    points[eye.corner_max] = Vec2::new(origin.x + size.x, origin.y + size.y * 0.5);
    points[eye.lid_top] = Vec2::new(origin.x + size.x * 0.5, origin.y);
    points[eye.lid_bottom] = Vec2::new(origin.x + size.x * 0.5, origin.y + size.y);
    points[eye.iris_center] = origin + size * iris;
}

pub fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}
