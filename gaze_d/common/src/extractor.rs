use api::{EyeLandmarks, FaceMeshIndices, LandmarkFrame};
use glam::Vec2;
use thiserror::Error;

use crate::config::ExtractorConfig;

/// Corner or lid spans smaller than this are treated as a closed or degenerate eye.
const MIN_EYE_SPAN: f32 = 0.001;
const NEUTRAL: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("insufficient landmarks: got {found}, need {required}")]
    InsufficientLandmarks { found: usize, required: usize },
    #[error("gaze sample is not a number")]
    InvalidSample,
}

/// Turns one landmark frame into a raw gaze sample in roughly [0, 1]².
#[derive(Debug, Clone)]
pub struct GazeExtractor {
    head_pose_weight: f32,
    indices: FaceMeshIndices,
}

impl GazeExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self::with_indices(config, FaceMeshIndices::default())
    }

    pub fn with_indices(config: &ExtractorConfig, indices: FaceMeshIndices) -> Self {
        Self {
            head_pose_weight: config.head_pose_weight.clamp(0.0, 1.0),
            indices,
        }
    }

    pub fn head_pose_weight(&self) -> f32 {
        self.head_pose_weight
    }

    pub fn set_head_pose_weight(&mut self, weight: f32) {
        self.head_pose_weight = weight.clamp(0.0, 1.0);
    }

    pub fn extract(&self, frame: &LandmarkFrame) -> Result<Vec2, ExtractError> {
        let required = self.indices.required_points();
        if frame.len() < required {
            return Err(ExtractError::InsufficientLandmarks {
                found: frame.len(),
                required,
            });
        }
        let points = &frame.points;

        let left = eye_position(points, &self.indices.left_eye);
        let right = eye_position(points, &self.indices.right_eye);
        let iris = (left + right) * 0.5;

        // Front camera image is mirrored on both axes.
        let iris = Vec2::ONE - iris;

        let center = points[self.indices.face_center];
        let head = Vec2::new(1.0 - center.x, center.y);

        let w = self.head_pose_weight;
        let raw = iris * (1.0 - w) + head * w;

        if raw.x.is_nan() || raw.y.is_nan() {
            return Err(ExtractError::InvalidSample);
        }
        Ok(raw)
    }
}

/// Iris position within the eye opening, each axis in [0, 1].
fn eye_position(points: &[Vec2], eye: &EyeLandmarks) -> Vec2 {
    let iris = points[eye.iris_center];
    let x = normalize_between(
        iris.x,
        points[eye.corner_min].x,
        points[eye.corner_max].x,
    );
    let y = normalize_between(iris.y, points[eye.lid_top].y, points[eye.lid_bottom].y);
    Vec2::new(x, y)
}

fn normalize_between(value: f32, min: f32, max: f32) -> f32 {
    let span = max - min;
    if span.abs() < MIN_EYE_SPAN {
        return NEUTRAL;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}
