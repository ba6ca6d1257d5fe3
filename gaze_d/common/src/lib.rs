pub use api::{FaceMeshIndices, GazePoint, LandmarkFrame, LandmarkSource};

pub mod calibration;
pub mod calibration_manager;
pub mod config;
mod engine;
mod extractor;
mod kalman_filter;
mod mailbox;
pub mod stability;

pub use calibration::{
    CalibrationError, CalibrationModel, CalibrationPoint, GazeRanges, MappingMode,
    PersistedCalibration,
};
pub use calibration_manager::{
    CalibrationManager, CalibrationStatus, CalibrationStore, JsonFileStore, MemoryStore,
    SharedCalibration,
};
pub use config::GazeConfig;
pub use engine::{EngineSnapshot, GazeEngine, GazeSink, PipelineStats};
pub use extractor::{ExtractError, GazeExtractor};
pub use kalman_filter::KalmanFilter;
pub use mailbox::FrameMailbox;
pub use stability::{HistoryBuffer, MotionClass, StabilityStage};
