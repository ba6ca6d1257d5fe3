mod landmarks;
pub use landmarks::{EyeLandmarks, FaceMeshIndices, FACE_MESH_POINTS};

use anyhow::Result;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// One detector output: normalized image-space landmarks plus a monotonic capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub points: Vec<Vec2>,
    pub timestamp_ms: u64,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Vec2>, timestamp_ms: u64) -> Self {
        Self {
            points,
            timestamp_ms,
        }
    }

    /// A frame with no landmarks, i.e. no face in view.
    pub fn empty(timestamp_ms: u64) -> Self {
        Self::new(Vec::new(), timestamp_ms)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> Option<Vec2> {
        self.points.get(index).copied()
    }
}

/// Final screen-space output of the pipeline, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GazePoint {
    pub x: f32,
    pub y: f32,
    pub timestamp_ms: u64,
}

impl GazePoint {
    pub fn new(x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self { x, y, timestamp_ms }
    }
}

/// Source of landmark frames (the external face landmark detector).
pub trait LandmarkSource: Send {
    fn initialize(&mut self) -> Result<()>;

    /// Returns the next available frame, or `None` when nothing arrived in time.
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>>;

    fn shutdown(&mut self);
}
