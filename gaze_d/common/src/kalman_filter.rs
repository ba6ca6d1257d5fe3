/// One-dimensional Kalman filter for a slowly varying scalar.
///
/// Each axis of the gaze signal owns its own instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanFilter {
    process_noise: f32,
    measurement_noise: f32,
    estimate: f32,
    error_covariance: f32,
}

pub const NEUTRAL_ESTIMATE: f32 = 0.5;

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new_with_config(0.001, 0.03)
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_config(process_noise: f32, measurement_noise: f32) -> Self {
        Self {
            process_noise,
            measurement_noise,
            estimate: NEUTRAL_ESTIMATE,
            error_covariance: 1.0,
        }
    }

    pub fn update(&mut self, measurement: f32) -> f32 {
        let predicted = self.error_covariance + self.process_noise;
        let gain = predicted / (predicted + self.measurement_noise);

        self.estimate += gain * (measurement - self.estimate);
        self.error_covariance = (1.0 - gain) * predicted;
        self.estimate
    }

    /// Restarts from `initial` with unit covariance.
    pub fn reset(&mut self, initial: f32) {
        self.estimate = initial;
        self.error_covariance = 1.0;
    }

    pub fn current(&self) -> f32 {
        self.estimate
    }

    pub fn error_covariance(&self) -> f32 {
        self.error_covariance
    }
}
