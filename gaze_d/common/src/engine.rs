use anyhow::Result;
use glam::Vec2;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::sync::PoisonError;

use crate::calibration::MappingMode;
use crate::calibration_manager::SharedCalibration;
use crate::config::{GazeConfig, ScreenConfig};
use crate::extractor::{ExtractError, GazeExtractor};
use crate::stability::{MotionClass, StabilityStage};
use crate::{GazePoint, LandmarkFrame};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub frames: u64,
    pub insufficient_landmarks: u64,
    pub invalid_samples: u64,
    pub stale_frames: u64,
    pub outliers: u64,
    pub emitted: u64,
}

/// Point-in-time view of the engine, published for the control path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub latest_gaze: Option<[f32; 2]>,
    pub last_output: Option<GazePoint>,
    pub motion: Option<MotionClass>,
    pub mode: MappingMode,
    pub stats: PipelineStats,
}

/// Per-frame pipeline: landmarks → raw gaze → stability stage → calibration → screen point.
pub struct GazeEngine {
    extractor: GazeExtractor,
    stability: StabilityStage,
    calibration: SharedCalibration,
    screen: ScreenConfig,
    mode: MappingMode,
    stats: PipelineStats,
    last_timestamp_ms: Option<u64>,
    last_output: Option<GazePoint>,
}

impl GazeEngine {
    pub fn new(config: &GazeConfig, calibration: SharedCalibration) -> Self {
        Self {
            extractor: GazeExtractor::new(&config.extractor),
            stability: StabilityStage::new(&config.stability, &config.filter),
            calibration,
            screen: config.screen,
            mode: MappingMode::default(),
            stats: PipelineStats::default(),
            last_timestamp_ms: None,
            last_output: None,
        }
    }

    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> Option<GazePoint> {
        self.stats.frames += 1;
        let ts = frame.timestamp_ms;

        if self.last_timestamp_ms.is_some_and(|last| ts < last) {
            self.stats.stale_frames += 1;
            trace!("Dropping out-of-order frame at {}ms", ts);
            return None;
        }
        self.last_timestamp_ms = Some(ts);

        match self.extractor.extract(frame) {
            Ok(raw) => self.process_raw(raw, ts),
            Err(e) => {
                match e {
                    ExtractError::InsufficientLandmarks { .. } => {
                        self.stats.insufficient_landmarks += 1
                    }
                    ExtractError::InvalidSample => self.stats.invalid_samples += 1,
                }
                trace!("Frame at {}ms dropped: {}", ts, e);
                self.stability.note_frame(ts);
                None
            }
        }
    }

    /// Runs an already extracted raw sample through the rest of the pipeline.
    pub fn process_raw(&mut self, raw: Vec2, timestamp_ms: u64) -> Option<GazePoint> {
        if !raw.is_finite() {
            self.stats.invalid_samples += 1;
            trace!("Non-finite raw gaze at {}ms dropped", timestamp_ms);
            self.stability.note_frame(timestamp_ms);
            return None;
        }

        let Some(smoothed) = self.stability.process(raw, timestamp_ms) else {
            self.stats.outliers += 1;
            return None;
        };

        let mapped = self
            .calibration
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map_to_screen(
                smoothed.x,
                smoothed.y,
                self.screen.width,
                self.screen.height,
                self.mode,
            );

        let max = Vec2::new(self.screen.width, self.screen.height);
        let point = if mapped.is_finite() {
            mapped.clamp(Vec2::ZERO, max)
        } else {
            max * 0.5
        };

        let out = GazePoint::new(point.x, point.y, timestamp_ms);
        self.stats.emitted += 1;
        self.last_output = Some(out);
        Some(out)
    }

    pub fn set_mapping_mode(&mut self, mode: MappingMode) {
        if mode != self.mode {
            debug!("Mapping mode changed to {:?}", mode);
            self.mode = mode;
        }
    }

    pub fn mapping_mode(&self) -> MappingMode {
        self.mode
    }

    /// Last smoothed gaze before calibration, in raw-gaze units.
    pub fn latest_gaze(&self) -> Option<Vec2> {
        self.stability.smoothed()
    }

    pub fn last_output(&self) -> Option<GazePoint> {
        self.last_output
    }

    pub fn last_motion(&self) -> Option<MotionClass> {
        self.stability.last_motion()
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn stability(&self) -> &StabilityStage {
        &self.stability
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            latest_gaze: self.latest_gaze().map(|g| g.to_array()),
            last_output: self.last_output,
            motion: self.last_motion(),
            mode: self.mode,
            stats: self.stats,
        }
    }

    /// Drops all per-session filter state, as on a tracking restart.
    pub fn reset(&mut self) {
        self.stability.reset();
        self.last_timestamp_ms = None;
        self.last_output = None;
    }
}

/// Consumer of emitted gaze points (cursor renderer, dwell logic, ...).
pub trait GazeSink: Send {
    fn initialize(&mut self) -> Result<()>;
    fn send(&self, point: &GazePoint) -> Result<()>;
}
