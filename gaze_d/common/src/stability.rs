//! Outlier rejection and velocity-adaptive smoothing of the raw gaze signal.
//!
//! Each accepted sample runs through a per-axis [`KalmanFilter`] and then an exponential blend
//! whose factor depends on how fast the gaze is moving: heavy smoothing while fixating, light
//! smoothing during a saccade so the cursor keeps up.

use glam::Vec2;
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::{FilterConfig, StabilityConfig};
use crate::kalman_filter::{KalmanFilter, NEUTRAL_ESTIMATE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionClass {
    Fixation,
    Intermediate,
    Saccade,
}

/// Fixed-capacity FIFO of recently accepted samples.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<Vec2>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Vec2) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec2> {
        self.samples.iter()
    }

    /// Per-axis mean and population standard deviation.
    pub fn mean_std_dev(&self) -> Option<(Vec2, Vec2)> {
        if self.samples.is_empty() {
            return None;
        }
        let n = self.samples.len() as f32;
        let mean = self.samples.iter().fold(Vec2::ZERO, |acc, s| acc + *s) / n;
        let variance = self.samples.iter().fold(Vec2::ZERO, |acc, s| {
            let d = *s - mean;
            acc + d * d
        }) / n;
        Some((mean, Vec2::new(variance.x.sqrt(), variance.y.sqrt())))
    }
}

#[derive(Debug, Clone)]
pub struct StabilityStage {
    config: StabilityConfig,
    history: HistoryBuffer,
    filter_x: KalmanFilter,
    filter_y: KalmanFilter,
    smoothed: Option<Vec2>,
    last_accepted: Option<Vec2>,
    last_frame_ms: Option<u64>,
    last_motion: Option<MotionClass>,
}

impl StabilityStage {
    pub fn new(config: &StabilityConfig, filter: &FilterConfig) -> Self {
        Self {
            config: config.clone(),
            history: HistoryBuffer::new(config.history_size),
            filter_x: KalmanFilter::new_with_config(filter.process_noise, filter.measurement_noise),
            filter_y: KalmanFilter::new_with_config(filter.process_noise, filter.measurement_noise),
            smoothed: None,
            last_accepted: None,
            last_frame_ms: None,
            last_motion: None,
        }
    }

    /// Runs one raw sample through the stage. `None` means the sample was rejected as an outlier.
    pub fn process(&mut self, raw: Vec2, timestamp_ms: u64) -> Option<Vec2> {
        let dt = self.elapsed_secs(timestamp_ms);
        self.last_frame_ms = Some(timestamp_ms);

        if self.is_outlier(raw) {
            trace!("Rejected outlier sample {:?}", raw);
            return None;
        }
        self.history.push(raw);

        let velocity = self
            .last_accepted
            .map_or(0.0, |prev| prev.distance(raw) / dt);
        let motion = self.classify(velocity);
        let factor = self.smoothing_factor(motion);

        let filtered = Vec2::new(self.filter_x.update(raw.x), self.filter_y.update(raw.y));
        let smoothed = match self.smoothed {
            Some(prev) => prev + (filtered - prev) * factor,
            None => filtered,
        };

        trace!(
            "v={:.4}/s {:?} factor={:.3} smoothed=({:.4}, {:.4})",
            velocity,
            motion,
            factor,
            smoothed.x,
            smoothed.y
        );

        self.smoothed = Some(smoothed);
        self.last_accepted = Some(raw);
        self.last_motion = Some(motion);
        Some(smoothed)
    }

    /// Records the arrival time of a frame that never produced a sample.
    pub fn note_frame(&mut self, timestamp_ms: u64) {
        self.last_frame_ms = Some(timestamp_ms);
    }

    pub fn is_outlier(&self, sample: Vec2) -> bool {
        if self.history.len() < self.config.min_history {
            return false;
        }
        let Some((mean, std_dev)) = self.history.mean_std_dev() else {
            return false;
        };

        let axis_outlier = |value: f32, mean: f32, std_dev: f32| {
            std_dev >= self.config.min_std_dev
                && (value - mean).abs() / std_dev > self.config.outlier_z_threshold
        };

        axis_outlier(sample.x, mean.x, std_dev.x) || axis_outlier(sample.y, mean.y, std_dev.y)
    }

    pub fn classify(&self, velocity: f32) -> MotionClass {
        if velocity > self.config.saccade_threshold {
            MotionClass::Saccade
        } else if velocity < self.config.fixation_threshold {
            MotionClass::Fixation
        } else {
            MotionClass::Intermediate
        }
    }

    pub fn smoothing_factor(&self, motion: MotionClass) -> f32 {
        match motion {
            MotionClass::Saccade => self.config.fast_factor,
            MotionClass::Fixation => self.config.slow_factor,
            MotionClass::Intermediate => (self.config.fast_factor + self.config.slow_factor) * 0.5,
        }
    }

    fn elapsed_secs(&self, timestamp_ms: u64) -> f32 {
        match self.last_frame_ms {
            Some(prev) if timestamp_ms > prev => (timestamp_ms - prev) as f32 / 1000.0,
            _ => self.config.default_dt,
        }
    }

    pub fn smoothed(&self) -> Option<Vec2> {
        self.smoothed
    }

    pub fn last_motion(&self) -> Option<MotionClass> {
        self.last_motion
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn filters(&self) -> (&KalmanFilter, &KalmanFilter) {
        (&self.filter_x, &self.filter_y)
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.filter_x.reset(NEUTRAL_ESTIMATE);
        self.filter_y.reset(NEUTRAL_ESTIMATE);
        self.smoothed = None;
        self.last_accepted = None;
        self.last_frame_ms = None;
        self.last_motion = None;
    }
}
