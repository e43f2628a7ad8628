use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/store", get(store_health))
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = state.store().health_check().is_ok();
    let (calibrated, calibrating) = {
        let pipeline = state.pipeline().lock().await;
        (pipeline.engine().is_calibrated(), pipeline.engine().is_calibrating())
    };

    Json(serde_json::json!({
        "status": if store_ok { "ok" } else { "degraded" },
        "uptimeSecs": state.uptime_secs(),
        "store": { "healthy": store_ok },
        "tracking": {
            "calibrated": calibrated,
            "calibrating": calibrating,
        },
        "sseConnections": state.sse_connections(),
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().health_check() {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = %e, "Readiness probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn store_health(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let healthy = state.store().health_check().is_ok();
    let latency_us = start.elapsed().as_micros() as u64;

    Json(serde_json::json!({
        "healthy": healthy,
        "latencyUs": latency_us,
    }))
}
