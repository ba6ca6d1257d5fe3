use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::calibration::{CalibrationModel, GazeRanges, PersistedCalibration};
use crate::config::CalibrationConfig;

/// Calibration model shared between the frame path (reads) and the control path (writes).
pub type SharedCalibration = Arc<RwLock<CalibrationModel>>;

pub trait CalibrationStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistedCalibration>>;
    fn save(&self, calibration: &PersistedCalibration) -> Result<()>;
    fn erase(&self) -> Result<()>;
    fn describe(&self) -> String;
}

/// Stores the calibration as `<storage_dir>/<namespace>.json`.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(storage_dir: impl AsRef<Path>, namespace: &str) -> Self {
        Self {
            path: storage_dir.as_ref().join(format!("{}.json", namespace)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalibrationStore for JsonFileStore {
    fn load(&self) -> Result<Option<PersistedCalibration>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open calibration file {:?}", self.path))?;
        let data = serde_json::from_reader(BufReader::new(file))
            .context("Failed to deserialize calibration data")?;
        Ok(Some(data))
    }

    fn save(&self, calibration: &PersistedCalibration) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create calibration dir: {:?}", parent))?;
            }
        }
        let file = File::create(&self.path).context("Failed to create calibration file")?;
        serde_json::to_writer_pretty(BufWriter::new(file), calibration)
            .context("Failed to serialize calibration data")?;
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove calibration file {:?}", self.path))?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{:?}", self.path)
    }
}

/// Keeps the calibration in process memory only.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<PersistedCalibration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CalibrationStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedCalibration>> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, calibration: &PersistedCalibration) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(calibration.clone());
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

impl<S: CalibrationStore + ?Sized> CalibrationStore for Arc<S> {
    fn load(&self) -> Result<Option<PersistedCalibration>> {
        (**self).load()
    }

    fn save(&self, calibration: &PersistedCalibration) -> Result<()> {
        (**self).save(calibration)
    }

    fn erase(&self) -> Result<()> {
        (**self).erase()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibrationStatus {
    pub point_count: usize,
    pub persisted_point_count: usize,
    pub calibrated: bool,
    pub finalized: bool,
    pub ranges: GazeRanges,
}

/// Control-path owner of the calibration: point capture, finalize, clear and persistence.
pub struct CalibrationManager {
    model: SharedCalibration,
    store: Box<dyn CalibrationStore>,
    persisted_point_count: usize,
    calibrated_threshold: usize,
}

impl CalibrationManager {
    pub fn new(config: &CalibrationConfig, store: Box<dyn CalibrationStore>) -> Self {
        Self {
            model: Arc::new(RwLock::new(CalibrationModel::new(config))),
            store,
            persisted_point_count: 0,
            calibrated_threshold: config.calibrated_threshold,
        }
    }

    pub fn from_config(config: &CalibrationConfig) -> Self {
        let store = JsonFileStore::new(&config.storage_dir, &config.namespace);
        Self::new(config, Box::new(store))
    }

    pub fn model(&self) -> SharedCalibration {
        self.model.clone()
    }

    pub fn load(&mut self) -> Result<()> {
        match self.store.load()? {
            Some(persisted) => {
                let restored = {
                    let mut model = self.model.write().unwrap_or_else(PoisonError::into_inner);
                    model.restore(&persisted);
                    model.len()
                };
                self.persisted_point_count = restored;
                info!(
                    "Loaded calibration with {} point(s) from {}",
                    restored,
                    self.store.describe()
                );
            }
            None => {
                info!(
                    "No calibration found at {}, using defaults",
                    self.store.describe()
                );
            }
        }
        Ok(())
    }

    pub fn add_point(
        &self,
        index: usize,
        gaze_x: f32,
        gaze_y: f32,
        target_x: Option<f32>,
        target_y: Option<f32>,
    ) {
        self.model
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add_point(index, gaze_x, gaze_y, target_x, target_y);
    }

    /// Finalizes and persists the calibration.
    ///
    /// Returns `Ok(None)` without touching storage when there are too few points.
    pub fn finalize(&mut self) -> Result<Option<GazeRanges>> {
        let (ranges, snapshot) = {
            let mut model = self.model.write().unwrap_or_else(PoisonError::into_inner);
            match model.finalize() {
                Ok(ranges) => (ranges, model.to_persisted()),
                Err(e) => {
                    warn!("Calibration not finalized: {}", e);
                    return Ok(None);
                }
            }
        };

        self.store
            .save(&snapshot)
            .with_context(|| format!("Failed to save calibration to {}", self.store.describe()))?;
        self.persisted_point_count = snapshot.point_count;
        info!(
            "Saved calibration with {} point(s) to {}",
            snapshot.point_count,
            self.store.describe()
        );
        Ok(Some(ranges))
    }

    pub fn clear(&mut self) -> Result<()> {
        self.model
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.persisted_point_count = 0;
        self.store
            .erase()
            .with_context(|| format!("Failed to erase calibration at {}", self.store.describe()))?;
        info!("Calibration cleared");
        Ok(())
    }

    /// True once a calibration with enough points has been persisted.
    pub fn is_calibrated(&self) -> bool {
        self.persisted_point_count >= self.calibrated_threshold
    }

    pub fn persisted_point_count(&self) -> usize {
        self.persisted_point_count
    }

    pub fn status(&self) -> CalibrationStatus {
        let model = self.model.read().unwrap_or_else(PoisonError::into_inner);
        CalibrationStatus {
            point_count: model.len(),
            persisted_point_count: self.persisted_point_count,
            calibrated: self.is_calibrated(),
            finalized: model.is_finalized(),
            ranges: model.ranges(),
        }
    }

    pub fn snapshot(&self) -> PersistedCalibration {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .to_persisted()
    }
}
