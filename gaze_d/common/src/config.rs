use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Share of the head-pose proxy in the blended raw gaze, in [0, 1].
    pub head_pose_weight: f32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            head_pose_weight: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    pub process_noise: f32,
    pub measurement_noise: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.001,
            measurement_noise: 0.03,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StabilityConfig {
    pub history_size: usize,
    /// Samples needed in history before outlier rejection kicks in.
    pub min_history: usize,
    pub outlier_z_threshold: f32,
    /// Below this standard deviation an axis never flags an outlier.
    pub min_std_dev: f32,
    pub fixation_threshold: f32,
    pub saccade_threshold: f32,
    pub slow_factor: f32,
    pub fast_factor: f32,
    /// Seconds assumed between samples when no earlier frame time exists.
    pub default_dt: f32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            history_size: 10,
            min_history: 3,
            outlier_z_threshold: 3.0,
            min_std_dev: 0.001,
            fixation_threshold: 0.015,
            saccade_threshold: 0.05,
            slow_factor: 0.08,
            fast_factor: 0.25,
            default_dt: 0.033,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    pub idw_power: f32,
    pub range_margin: f32,
    pub calibrated_threshold: usize,
    pub min_finalize_points: usize,
    /// Upper bound on target indices accepted from the control API.
    pub max_calibration_points: usize,
    pub exact_match_distance: f32,
    pub min_range_span: f32,
    pub storage_dir: PathBuf,
    pub namespace: String,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            idw_power: 2.0,
            range_margin: 0.15,
            calibrated_threshold: 5,
            min_finalize_points: 3,
            max_calibration_points: 64,
            exact_match_distance: 0.001,
            min_range_span: 0.01,
            storage_dir: PathBuf::from("calibration"),
            namespace: "gaze_calibration".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IoConfig {
    pub landmark_listen_address: String,
    pub output_address: String,
    pub output_enabled: bool,
    pub control_port: u16,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            landmark_listen_address: "127.0.0.1:9100".to_string(),
            output_address: "127.0.0.1:9101".to_string(),
            output_enabled: true,
            control_port: 9102,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GazeConfig {
    pub extractor: ExtractorConfig,
    pub filter: FilterConfig,
    pub stability: StabilityConfig,
    pub calibration: CalibrationConfig,
    pub screen: ScreenConfig,
    pub io: IoConfig,
}

fn clamp_unit(name: &str, value: &mut f32) {
    if !value.is_finite() || !(0.0..=1.0).contains(value) {
        let fixed = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.5
        };
        warn!("Config: {} = {} out of [0, 1], using {}", name, value, fixed);
        *value = fixed;
    }
}

fn ensure_positive(name: &str, value: &mut f32, fallback: f32) {
    if !value.is_finite() || *value <= 0.0 {
        warn!("Config: {} = {} must be positive, using {}", name, value, fallback);
        *value = fallback;
    }
}

impl GazeConfig {
    /// Returns a copy with every out-of-range field corrected.
    pub fn validated(mut self) -> Self {
        self.validate();
        self
    }

    /// Brings all fields back into their legal ranges, logging each correction.
    pub fn validate(&mut self) {
        let defaults = GazeConfig::default();

        clamp_unit("extractor.head_pose_weight", &mut self.extractor.head_pose_weight);

        ensure_positive(
            "filter.process_noise",
            &mut self.filter.process_noise,
            defaults.filter.process_noise,
        );
        ensure_positive(
            "filter.measurement_noise",
            &mut self.filter.measurement_noise,
            defaults.filter.measurement_noise,
        );

        let st = &mut self.stability;
        if st.min_history < 2 {
            warn!("Config: stability.min_history = {} is too small, using 2", st.min_history);
            st.min_history = 2;
        }
        if st.history_size < st.min_history {
            warn!(
                "Config: stability.history_size = {} is below min_history, using {}",
                st.history_size, st.min_history
            );
            st.history_size = st.min_history;
        }
        ensure_positive(
            "stability.outlier_z_threshold",
            &mut st.outlier_z_threshold,
            defaults.stability.outlier_z_threshold,
        );
        ensure_positive(
            "stability.min_std_dev",
            &mut st.min_std_dev,
            defaults.stability.min_std_dev,
        );
        ensure_positive(
            "stability.fixation_threshold",
            &mut st.fixation_threshold,
            defaults.stability.fixation_threshold,
        );
        ensure_positive(
            "stability.saccade_threshold",
            &mut st.saccade_threshold,
            defaults.stability.saccade_threshold,
        );
        if st.fixation_threshold > st.saccade_threshold {
            warn!("Config: fixation_threshold exceeds saccade_threshold, swapping");
            std::mem::swap(&mut st.fixation_threshold, &mut st.saccade_threshold);
        }
        clamp_unit("stability.slow_factor", &mut st.slow_factor);
        clamp_unit("stability.fast_factor", &mut st.fast_factor);
        ensure_positive(
            "stability.default_dt",
            &mut st.default_dt,
            defaults.stability.default_dt,
        );

        let cal = &mut self.calibration;
        ensure_positive(
            "calibration.idw_power",
            &mut cal.idw_power,
            defaults.calibration.idw_power,
        );
        if !cal.range_margin.is_finite() || cal.range_margin < 0.0 {
            warn!(
                "Config: calibration.range_margin = {} is invalid, using {}",
                cal.range_margin, defaults.calibration.range_margin
            );
            cal.range_margin = defaults.calibration.range_margin;
        }
        if cal.min_finalize_points == 0 {
            cal.min_finalize_points = defaults.calibration.min_finalize_points;
        }
        if cal.max_calibration_points < cal.min_finalize_points {
            warn!(
                "Config: calibration.max_calibration_points = {} is below min_finalize_points, using {}",
                cal.max_calibration_points, cal.min_finalize_points
            );
            cal.max_calibration_points = cal.min_finalize_points;
        }
        ensure_positive(
            "calibration.exact_match_distance",
            &mut cal.exact_match_distance,
            defaults.calibration.exact_match_distance,
        );
        ensure_positive(
            "calibration.min_range_span",
            &mut cal.min_range_span,
            defaults.calibration.min_range_span,
        );
        if cal.namespace.trim().is_empty() {
            warn!("Config: calibration.namespace is empty, using default");
            cal.namespace = defaults.calibration.namespace;
        }

        ensure_positive("screen.width", &mut self.screen.width, defaults.screen.width);
        ensure_positive("screen.height", &mut self.screen.height, defaults.screen.height);
    }
}
