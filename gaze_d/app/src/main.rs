mod control;
mod dispatcher;
mod receiver;
mod strategies;

use anyhow::Result;
use api::LandmarkSource;
use common::{
    CalibrationManager, EngineSnapshot, FrameMailbox, GazeConfig, GazeEngine, MappingMode,
};
use control::{ControlHost, ControlState};
use log::{debug, error, info, trace, warn};
use receiver::UdpLandmarkSource;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use dispatcher::Dispatcher;

const FRAME_WAIT: Duration = Duration::from_millis(100);
const STATS_INTERVAL: Duration = Duration::from_secs(5);

fn load_config(path: &Path) -> Result<GazeConfig> {
    if path.exists() {
        info!("Loading config from {:?}", path);
        let file = fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config = serde_json::from_reader(reader)?;
        Ok(config)
    } else {
        info!("Config not found. Creating default at {:?}", path);
        let config = GazeConfig::default();
        let file = fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &config)?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    info!("Starting...");
    debug!("Debug logging is active");
    trace!("Trace logging is active");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        info!("Received Ctrl-C, shutting down...");
        r.store(false, Ordering::SeqCst);
    })?;

    let config_path = Path::new("config.json");
    let config = load_config(config_path)
        .unwrap_or_else(|e| {
            error!("Failed to load config: {}. Using defaults.", e);
            GazeConfig::default()
        })
        .validated();
    info!("Loaded Config: {:?}", config);

    let mut calibration = CalibrationManager::from_config(&config.calibration);
    if let Err(e) = calibration.load() {
        error!("Failed to load calibration: {:#}", e);
    }
    info!(
        "Calibration complete: {} ({} persisted point(s))",
        calibration.is_calibrated(),
        calibration.persisted_point_count()
    );

    let model = calibration.model();
    let calibration = Arc::new(Mutex::new(calibration));
    let snapshot = Arc::new(RwLock::new(EngineSnapshot::default()));
    let mode_request = Arc::new(RwLock::new(MappingMode::default()));
    let mailbox = Arc::new(FrameMailbox::new());

    let mut transport_manager = Dispatcher::new(strategies::create_strategy(&config));
    if let Err(e) = transport_manager.initialize() {
        error!("Failed to initialize gaze output: {}", e);
        return Err(e);
    }

    let control_state = ControlState {
        calibration: calibration.clone(),
        snapshot: snapshot.clone(),
        mode_request: mode_request.clone(),
        max_points: config.calibration.max_calibration_points,
    };
    let control_port = config.io.control_port;
    thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                error!("Failed to create Tokio runtime: {}", e);
                return;
            }
        };
        rt.block_on(async {
            let router = control::get_router(control_state);
            if let Err(e) = ControlHost::start(control_port, router).await {
                error!("Control API failed: {}", e);
            }
        });
    });

    let mut source = UdpLandmarkSource::new(config.io.landmark_listen_address.clone());
    source.initialize()?;

    let running_receiver = running.clone();
    let mailbox_for_receiver = mailbox.clone();
    let receiver_handle = thread::spawn(move || {
        info!("Receiver Thread Started");
        while running_receiver.load(Ordering::SeqCst) {
            match source.next_frame() {
                Ok(Some(frame)) => {
                    if mailbox_for_receiver.post(frame) {
                        trace!("Pending frame replaced before processing");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Landmark receive error: {:#}", e);
                    thread::sleep(FRAME_WAIT);
                }
            }
        }
        source.shutdown();
    });

    let running_consumer = running.clone();
    let consumer_handle = thread::spawn(move || {
        info!("Consumer Thread Started");

        let mut engine = GazeEngine::new(&config, model);
        let mut last_stats = Instant::now();

        while running_consumer.load(Ordering::SeqCst) {
            let mode = *mode_request.read().unwrap_or_else(PoisonError::into_inner);
            engine.set_mapping_mode(mode);

            let Some(frame) = mailbox.take_timeout(FRAME_WAIT) else {
                continue;
            };

            if let Some(point) = engine.process_frame(&frame) {
                #[cfg(feature = "xtralog")]
                debug!(
                    "gaze ({:.1}, {:.1}) motion={:?}",
                    point.x,
                    point.y,
                    engine.last_motion()
                );
                transport_manager.dispatch(&point);
            }

            if let Ok(mut write_guard) = snapshot.write() {
                *write_guard = engine.snapshot();
            }

            if last_stats.elapsed() >= STATS_INTERVAL {
                last_stats = Instant::now();
                debug!(
                    "Pipeline: {:?}, frames replaced in mailbox: {}, output sent/failed: {}/{}",
                    engine.stats(),
                    mailbox.replaced_count(),
                    transport_manager.sent(),
                    transport_manager.failures()
                );
            }
        }
        info!("Consumer Thread Stopped");
    });

    if receiver_handle.join().is_err() {
        error!("Receiver thread panicked");
    }
    if consumer_handle.join().is_err() {
        error!("Consumer thread panicked");
    }

    info!("Shutdown complete");
    Ok(())
}
