use anyhow::Result;
use common::{GazePoint, GazeSink};
use log::{info, trace};

/// Output used when no consumer is configured; points only reach the trace log.
pub struct LogOnlyStrategy;

impl GazeSink for LogOnlyStrategy {
    fn initialize(&mut self) -> Result<()> {
        info!("Gaze output disabled; points are only logged at trace level");
        Ok(())
    }

    fn send(&self, point: &GazePoint) -> Result<()> {
        trace!("gaze ({:.1}, {:.1}) @ {}ms", point.x, point.y, point.timestamp_ms);
        Ok(())
    }
}
