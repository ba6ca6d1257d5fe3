use crate::strategies::OutputBackend;
use anyhow::Result;
use common::{GazePoint, GazeSink};
use log::{error, info};
use std::time::{Duration, Instant};

const ERROR_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Delivers emitted points to the output backend and keeps the frame loop quiet
/// while the consumer on the other end is unreachable.
pub struct Dispatcher<S: GazeSink = OutputBackend> {
    backend: S,
    sent: u64,
    failures: u64,
    suppressed: u64,
    last_error_log: Option<Instant>,
    failing: bool,
}

impl<S: GazeSink> Dispatcher<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            sent: 0,
            failures: 0,
            suppressed: 0,
            last_error_log: None,
            failing: false,
        }
    }

    pub fn initialize(&mut self) -> Result<()> {
        self.backend.initialize()
    }

    /// Returns whether the point reached the backend. Failures are logged at most
    /// once per interval, with a count of the ones held back since.
    pub fn dispatch(&mut self, point: &GazePoint) -> bool {
        match self.backend.send(point) {
            Ok(()) => {
                self.sent += 1;
                if self.failing {
                    info!(
                        "Gaze output recovered after {} failed send(s)",
                        self.suppressed + 1
                    );
                    self.failing = false;
                    self.suppressed = 0;
                }
                true
            }
            Err(e) => {
                self.failures += 1;
                let due = self
                    .last_error_log
                    .map_or(true, |at| at.elapsed() >= ERROR_LOG_INTERVAL);
                if due {
                    if self.suppressed > 0 {
                        error!(
                            "Failed to send gaze point: {} ({} more failure(s) since last report)",
                            e, self.suppressed
                        );
                    } else {
                        error!("Failed to send gaze point: {}", e);
                    }
                    self.last_error_log = Some(Instant::now());
                    self.suppressed = 0;
                } else {
                    self.suppressed += 1;
                }
                self.failing = true;
                false
            }
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}
