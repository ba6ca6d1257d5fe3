pub mod generic_udp;
pub mod log_only;

use anyhow::Result;
use common::{GazeConfig, GazePoint, GazeSink};
use generic_udp::GenericUdpStrategy;
use log_only::LogOnlyStrategy;

pub enum OutputBackend {
    Udp(GenericUdpStrategy),
    LogOnly(LogOnlyStrategy),
}

impl GazeSink for OutputBackend {
    fn initialize(&mut self) -> Result<()> {
        match self {
            Self::Udp(s) => s.initialize(),
            Self::LogOnly(s) => s.initialize(),
        }
    }

    fn send(&self, point: &GazePoint) -> Result<()> {
        match self {
            Self::Udp(s) => s.send(point),
            Self::LogOnly(s) => s.send(point),
        }
    }
}

pub fn create_strategy(config: &GazeConfig) -> OutputBackend {
    if config.io.output_enabled {
        OutputBackend::Udp(GenericUdpStrategy::new(config.io.output_address.clone()))
    } else {
        OutputBackend::LogOnly(LogOnlyStrategy)
    }
}
