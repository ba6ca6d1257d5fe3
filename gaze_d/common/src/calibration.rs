use glam::Vec2;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CalibrationConfig;

/// One calibration target and the raw gaze observed while the user looked at it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub target_x: f32,
    pub target_y: f32,
    pub gaze_x: f32,
    pub gaze_y: f32,
}

impl CalibrationPoint {
    /// Placeholder used to fill gaps below an added index.
    pub const NEUTRAL: Self = Self {
        target_x: 0.5,
        target_y: 0.5,
        gaze_x: 0.5,
        gaze_y: 0.5,
    };

    pub fn new(target_x: f32, target_y: f32, gaze_x: f32, gaze_y: f32) -> Self {
        Self {
            target_x,
            target_y,
            gaze_x,
            gaze_y,
        }
    }

    pub fn gaze(&self) -> Vec2 {
        Vec2::new(self.gaze_x, self.gaze_y)
    }

    pub fn target(&self) -> Vec2 {
        Vec2::new(self.target_x, self.target_y)
    }

    fn sanitized(mut self) -> Self {
        for v in [
            &mut self.target_x,
            &mut self.target_y,
            &mut self.gaze_x,
            &mut self.gaze_y,
        ] {
            if !v.is_finite() {
                *v = 0.5;
            }
        }
        self
    }
}

/// Observed raw-gaze extent used by range mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeRanges {
    pub min_gaze_x: f32,
    pub max_gaze_x: f32,
    pub min_gaze_y: f32,
    pub max_gaze_y: f32,
}

impl Default for GazeRanges {
    fn default() -> Self {
        Self {
            min_gaze_x: 0.4,
            max_gaze_x: 0.6,
            min_gaze_y: 0.4,
            max_gaze_y: 0.6,
        }
    }
}

impl GazeRanges {
    fn is_finite(&self) -> bool {
        self.min_gaze_x.is_finite()
            && self.max_gaze_x.is_finite()
            && self.min_gaze_y.is_finite()
            && self.max_gaze_y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMode {
    /// Apply the calibration (IDW or range mapping).
    #[default]
    Transformed,
    /// Put the raw gaze straight onto the screen; used while capturing calibration targets.
    Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CalibrationError {
    #[error("not enough calibration points: got {found}, need {required}")]
    NotEnoughPoints { found: usize, required: usize },
}

/// Storage layout of a calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedCalibration {
    pub point_count: usize,
    pub points: Vec<CalibrationPoint>,
    #[serde(flatten)]
    pub ranges: GazeRanges,
}

#[derive(Debug, Clone)]
pub struct CalibrationModel {
    points: Vec<CalibrationPoint>,
    ranges: GazeRanges,
    finalized: bool,
    idw_power: f32,
    range_margin: f32,
    min_finalize_points: usize,
    exact_match_distance: f32,
    min_range_span: f32,
}

impl Default for CalibrationModel {
    fn default() -> Self {
        Self::new(&CalibrationConfig::default())
    }
}

impl CalibrationModel {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            points: Vec::new(),
            ranges: GazeRanges::default(),
            finalized: false,
            idw_power: config.idw_power,
            range_margin: config.range_margin,
            min_finalize_points: config.min_finalize_points,
            exact_match_distance: config.exact_match_distance,
            min_range_span: config.min_range_span,
        }
    }

    /// Stores the point for target `index`, overwriting any earlier capture for it.
    pub fn add_point(
        &mut self,
        index: usize,
        gaze_x: f32,
        gaze_y: f32,
        target_x: Option<f32>,
        target_y: Option<f32>,
    ) {
        let point = CalibrationPoint::new(
            target_x.unwrap_or(0.5),
            target_y.unwrap_or(0.5),
            gaze_x,
            gaze_y,
        );

        if index < self.points.len() {
            self.points[index] = point;
        } else {
            self.points.resize(index, CalibrationPoint::NEUTRAL);
            self.points.push(point);
        }
        debug!(
            "Calibration point {} set: target=({:.3}, {:.3}) gaze=({:.4}, {:.4})",
            index, point.target_x, point.target_y, gaze_x, gaze_y
        );
    }

    /// Recomputes the gaze ranges from the stored points, widened by the configured margin.
    pub fn finalize(&mut self) -> Result<GazeRanges, CalibrationError> {
        if self.points.len() < self.min_finalize_points {
            warn!(
                "Cannot finalize calibration with {} point(s), need {}",
                self.points.len(),
                self.min_finalize_points
            );
            return Err(CalibrationError::NotEnoughPoints {
                found: self.points.len(),
                required: self.min_finalize_points,
            });
        }

        let (mut min, mut max) = (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY));
        for p in &self.points {
            min = min.min(p.gaze());
            max = max.max(p.gaze());
        }
        // The margin is the total widening, split evenly between both ends.
        let margin = (max - min) * self.range_margin * 0.5;
        let (min, max) = (min - margin, max + margin);

        self.ranges = GazeRanges {
            min_gaze_x: min.x,
            max_gaze_x: max.x,
            min_gaze_y: min.y,
            max_gaze_y: max.y,
        };
        self.finalized = true;
        Ok(self.ranges)
    }

    pub fn map_to_screen(
        &self,
        gaze_x: f32,
        gaze_y: f32,
        screen_width: f32,
        screen_height: f32,
        mode: MappingMode,
    ) -> Vec2 {
        let screen = Vec2::new(screen_width, screen_height);
        let gaze = Vec2::new(gaze_x, gaze_y);

        let mapped = match mode {
            MappingMode::Identity => gaze * screen,
            MappingMode::Transformed if self.points.is_empty() => self.range_map(gaze) * screen,
            MappingMode::Transformed => self.interpolate(gaze).unwrap_or(Vec2::splat(0.5)) * screen,
        };

        if !mapped.is_finite() {
            return screen * 0.5;
        }
        mapped.clamp(Vec2::ZERO, screen.max(Vec2::ZERO))
    }

    fn range_map(&self, gaze: Vec2) -> Vec2 {
        let r = &self.ranges;
        Vec2::new(
            normalize_axis(gaze.x, r.min_gaze_x, r.max_gaze_x, self.min_range_span),
            normalize_axis(gaze.y, r.min_gaze_y, r.max_gaze_y, self.min_range_span),
        )
    }

    /// Inverse-distance-weighted average of target positions, in normalized screen units.
    fn interpolate(&self, gaze: Vec2) -> Option<Vec2> {
        let nearest = self
            .points
            .iter()
            .map(|p| (gaze.distance(p.gaze()), p))
            .filter(|(distance, _)| *distance < self.exact_match_distance)
            .min_by(|a, b| a.0.total_cmp(&b.0));
        if let Some((_, p)) = nearest {
            return Some(p.target());
        }

        let mut weighted = Vec2::ZERO;
        let mut total = 0.0f32;

        for p in &self.points {
            let distance = gaze.distance(p.gaze());
            let weight = 1.0 / distance.powf(self.idw_power);
            weighted += p.target() * weight;
            total += weight;
        }

        if total > 0.0 && total.is_finite() {
            Some(weighted / total)
        } else {
            None
        }
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn ranges(&self) -> GazeRanges {
        self.ranges
    }

    /// Whether `finalize` has produced ranges for the current point set.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.ranges = GazeRanges::default();
        self.finalized = false;
    }

    pub fn to_persisted(&self) -> PersistedCalibration {
        let points: Vec<CalibrationPoint> =
            self.points.iter().map(|p| p.sanitized()).collect();
        let ranges = if self.ranges.is_finite() {
            self.ranges
        } else {
            GazeRanges::default()
        };
        PersistedCalibration {
            point_count: points.len(),
            points,
            ranges,
        }
    }

    pub fn restore(&mut self, persisted: &PersistedCalibration) {
        let mut points = persisted.points.clone();
        if persisted.point_count != points.len() {
            warn!(
                "Stored calibration claims {} point(s) but holds {}",
                persisted.point_count,
                points.len()
            );
            points.truncate(persisted.point_count);
        }
        self.points = points;
        self.ranges = if persisted.ranges.is_finite() {
            persisted.ranges
        } else {
            GazeRanges::default()
        };
        self.finalized = self.points.len() >= self.min_finalize_points;
    }
}

fn normalize_axis(value: f32, min: f32, max: f32, min_span: f32) -> f32 {
    let span = max - min;
    if span <= min_span {
        return 0.5;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}
