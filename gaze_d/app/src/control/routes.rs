use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use common::{CalibrationManager, EngineSnapshot, MappingMode};
use log::{error, info};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

#[derive(Clone)]
pub struct ControlState {
    pub calibration: Arc<Mutex<CalibrationManager>>,
    pub snapshot: Arc<RwLock<EngineSnapshot>>,
    pub mode_request: Arc<RwLock<MappingMode>>,
    pub max_points: usize,
}

pub fn get_router(state: ControlState) -> Router {
    Router::new()
        .route(
            "/calibration",
            get(calibration_status_handler).delete(clear_handler),
        )
        .route("/calibration/status", get(calibration_status_handler))
        .route("/calibration/data", get(calibration_data_handler))
        .route("/calibration/point", post(add_point_handler))
        .route("/calibration/finalize", post(finalize_handler))
        .route("/calibration/mode", post(mode_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

type Reply = (StatusCode, Json<Value>);

fn internal_error(message: String) -> Reply {
    error!("{}", message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "error", "message": message })),
    )
}

async fn calibration_status_handler(State(state): State<ControlState>) -> Json<Value> {
    let status = state
        .calibration
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .status();
    Json(json!({
        "status": "ok",
        "calibration": status
    }))
}

async fn calibration_data_handler(State(state): State<ControlState>) -> Json<Value> {
    let data = state
        .calibration
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .snapshot();
    Json(json!({
        "status": "ok",
        "data": data
    }))
}

#[derive(Debug, serde::Deserialize)]
struct AddPointPayload {
    index: usize,
    gaze_x: Option<f32>,
    gaze_y: Option<f32>,
    target_x: Option<f32>,
    target_y: Option<f32>,
}

async fn add_point_handler(
    State(state): State<ControlState>,
    Json(payload): Json<AddPointPayload>,
) -> Reply {
    if payload.index >= state.max_points {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "status": "index_out_of_range",
                "message": format!(
                    "Calibration index {} exceeds the limit of {} points",
                    payload.index, state.max_points
                )
            })),
        );
    }

    let observed = match (payload.gaze_x, payload.gaze_y) {
        (Some(x), Some(y)) => Some([x, y]),
        _ => state
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .latest_gaze,
    };

    let Some([gaze_x, gaze_y]) = observed else {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "status": "no_gaze",
                "message": "No gaze sample available yet; supply gaze_x and gaze_y"
            })),
        );
    };

    let manager = state
        .calibration
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    manager.add_point(
        payload.index,
        gaze_x,
        gaze_y,
        payload.target_x,
        payload.target_y,
    );

    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "index": payload.index,
            "gaze": [gaze_x, gaze_y],
            "calibration": manager.status()
        })),
    )
}

async fn finalize_handler(State(state): State<ControlState>) -> Reply {
    let calibration = state.calibration.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut manager = calibration.lock().unwrap_or_else(PoisonError::into_inner);
        manager.finalize().map(|ranges| (ranges, manager.status()))
    })
    .await;

    match result {
        Ok(Ok((Some(ranges), status))) => {
            info!("Calibration finalized over HTTP");
            (
                StatusCode::OK,
                Json(json!({ "status": "ok", "ranges": ranges, "calibration": status })),
            )
        }
        Ok(Ok((None, status))) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "status": "not_enough_points",
                "calibration": status
            })),
        ),
        Ok(Err(e)) => internal_error(format!("Failed to finalize calibration: {:#}", e)),
        Err(e) => internal_error(format!("Finalize task failed: {}", e)),
    }
}

async fn clear_handler(State(state): State<ControlState>) -> Reply {
    let calibration = state.calibration.clone();
    let result = tokio::task::spawn_blocking(move || {
        calibration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear()
    })
    .await;

    match result {
        Ok(Ok(())) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Ok(Err(e)) => internal_error(format!("Failed to clear calibration: {:#}", e)),
        Err(e) => internal_error(format!("Clear task failed: {}", e)),
    }
}

#[derive(Debug, serde::Deserialize)]
struct ModePayload {
    mode: MappingMode,
}

async fn mode_handler(
    State(state): State<ControlState>,
    Json(payload): Json<ModePayload>,
) -> Json<Value> {
    *state
        .mode_request
        .write()
        .unwrap_or_else(PoisonError::into_inner) = payload.mode;
    info!("Mapping mode set to {:?}", payload.mode);
    Json(json!({ "status": "ok", "mode": payload.mode }))
}

async fn stats_handler(State(state): State<ControlState>) -> Json<Value> {
    let snapshot = *state
        .snapshot
        .read()
        .unwrap_or_else(PoisonError::into_inner);
    Json(json!({ "status": "ok", "engine": snapshot }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use common::config::CalibrationConfig;
    use common::{CalibrationStore, MemoryStore};
    use tower::ServiceExt;

    fn test_state(store: &Arc<MemoryStore>) -> ControlState {
        let config = CalibrationConfig::default();
        let manager = CalibrationManager::new(&config, Box::new(store.clone()));
        ControlState {
            calibration: Arc::new(Mutex::new(manager)),
            snapshot: Arc::new(RwLock::new(EngineSnapshot::default())),
            mode_request: Arc::new(RwLock::new(MappingMode::default())),
            max_points: config.max_calibration_points,
        }
    }

    async fn call(
        state: &ControlState,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = get_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn point_count(state: &ControlState) -> usize {
        state.calibration.lock().unwrap().status().point_count
    }

    #[tokio::test]
    async fn add_point_without_gaze_is_a_conflict() {
        let state = test_state(&Arc::new(MemoryStore::new()));
        let (status, body) = call(
            &state,
            Method::POST,
            "/calibration/point",
            Some(json!({ "index": 0 })),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], "no_gaze");
        assert_eq!(point_count(&state), 0);
    }

    #[tokio::test]
    async fn add_point_falls_back_to_latest_gaze() {
        let state = test_state(&Arc::new(MemoryStore::new()));
        state.snapshot.write().unwrap().latest_gaze = Some([0.45, 0.55]);

        let (status, body) = call(
            &state,
            Method::POST,
            "/calibration/point",
            Some(json!({ "index": 2, "target_x": 0.1, "target_y": 0.9 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["calibration"]["point_count"], 3);
        let model = state.calibration.lock().unwrap().model();
        let point = model.read().unwrap().points()[2];
        assert_eq!((point.gaze_x, point.gaze_y), (0.45, 0.55));
        assert_eq!((point.target_x, point.target_y), (0.1, 0.9));
    }

    #[tokio::test]
    async fn add_point_rejects_index_beyond_limit() {
        let state = test_state(&Arc::new(MemoryStore::new()));
        for index in [state.max_points, usize::MAX] {
            let (status, body) = call(
                &state,
                Method::POST,
                "/calibration/point",
                Some(json!({ "index": index, "gaze_x": 0.5, "gaze_y": 0.5 })),
            )
            .await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body["status"], "index_out_of_range");
        }
        assert_eq!(point_count(&state), 0);
    }

    #[tokio::test]
    async fn finalize_without_enough_points_is_unprocessable() {
        let store = Arc::new(MemoryStore::new());
        let state = test_state(&store);
        for index in 0..2 {
            let payload = json!({ "index": index, "gaze_x": 0.45, "gaze_y": 0.5 });
            call(&state, Method::POST, "/calibration/point", Some(payload)).await;
        }

        let (status, body) = call(&state, Method::POST, "/calibration/finalize", None).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], "not_enough_points");
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn finalize_then_delete_erases_storage() {
        let store = Arc::new(MemoryStore::new());
        let state = test_state(&store);
        for (index, gaze) in [(0, 0.42), (1, 0.5), (2, 0.58)] {
            let payload = json!({ "index": index, "gaze_x": gaze, "gaze_y": gaze });
            call(&state, Method::POST, "/calibration/point", Some(payload)).await;
        }

        let (status, body) = call(&state, Method::POST, "/calibration/finalize", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["calibration"]["persisted_point_count"], 3);
        assert_eq!(store.load().unwrap().map(|c| c.point_count), Some(3));

        let (status, _) = call(&state, Method::DELETE, "/calibration", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(store.load().unwrap().is_none());
        assert_eq!(point_count(&state), 0);

        let (_, body) = call(&state, Method::GET, "/calibration/status", None).await;
        assert_eq!(body["calibration"]["calibrated"], false);
    }

    #[tokio::test]
    async fn mode_switch_reaches_the_engine_request_slot() {
        let state = test_state(&Arc::new(MemoryStore::new()));

        let (status, body) = call(
            &state,
            Method::POST,
            "/calibration/mode",
            Some(json!({ "mode": "identity" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "identity");
        assert_eq!(*state.mode_request.read().unwrap(), MappingMode::Identity);

        call(
            &state,
            Method::POST,
            "/calibration/mode",
            Some(json!({ "mode": "transformed" })),
        )
        .await;
        assert_eq!(*state.mode_request.read().unwrap(), MappingMode::Transformed);
    }
}
