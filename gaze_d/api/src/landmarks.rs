//! Face-mesh landmark indices used by the gaze extractor.
//!
//! Indices follow the 478-point refined face mesh (468 face points plus 10 iris points).
//! "Left" and "right" refer to the subject's eyes, so the subject's right eye sits on the
//! image's left side.

use serde::{Deserialize, Serialize};

/// Minimum number of points a frame must carry for the iris landmarks to exist.
pub const FACE_MESH_POINTS: usize = 478;

/// Landmarks describing a single eye.
///
/// `corner_min` / `corner_max` are ordered so that the horizontal coordinate grows from
/// `corner_min` to `corner_max` in image space for both eyes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeLandmarks {
    pub iris_center: usize,
    pub corner_min: usize,
    pub corner_max: usize,
    pub lid_top: usize,
    pub lid_bottom: usize,
}

impl EyeLandmarks {
    pub const RIGHT: Self = Self {
        iris_center: 468,
        corner_min: 33,
        corner_max: 133,
        lid_top: 159,
        lid_bottom: 145,
    };

    pub const LEFT: Self = Self {
        iris_center: 473,
        corner_min: 362,
        corner_max: 263,
        lid_top: 386,
        lid_bottom: 374,
    };

    fn max_index(&self) -> usize {
        self.iris_center
            .max(self.corner_min)
            .max(self.corner_max)
            .max(self.lid_top)
            .max(self.lid_bottom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceMeshIndices {
    pub left_eye: EyeLandmarks,
    pub right_eye: EyeLandmarks,
    /// Single point used as the head-pose proxy (nose tip).
    pub face_center: usize,
}

impl Default for FaceMeshIndices {
    fn default() -> Self {
        Self {
            left_eye: EyeLandmarks::LEFT,
            right_eye: EyeLandmarks::RIGHT,
            face_center: 1,
        }
    }
}

impl FaceMeshIndices {
    /// Number of points a frame needs for every index in this table to resolve.
    pub fn required_points(&self) -> usize {
        let highest = self
            .left_eye
            .max_index()
            .max(self.right_eye.max_index())
            .max(self.face_center);
        (highest + 1).max(FACE_MESH_POINTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_requires_full_mesh() {
        assert_eq!(FaceMeshIndices::default().required_points(), FACE_MESH_POINTS);
    }
}
