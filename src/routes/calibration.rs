use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use crate::actions::TrackingEvent;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::tracking::calibration::{CalibrationProgress, CalibrationStep};
use crate::tracking::{CalibrationBounds, CalibrationRecord};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_calibration).delete(reset_calibration))
        .route("/start", post(start_calibration))
        .route("/cancel", post(cancel_calibration))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalibrationStatus {
    calibrated: bool,
    calibrating: bool,
    bounds: Option<CalibrationBounds>,
    record: Option<CalibrationRecord>,
    progress: Option<CalibrationProgress>,
}

async fn get_calibration(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let record = state.store().load_calibration()?;
    let pipeline = state.pipeline().lock().await;
    let engine = pipeline.engine();

    Ok(ok(CalibrationStatus {
        calibrated: engine.is_calibrated(),
        calibrating: engine.is_calibrating(),
        bounds: engine.bounds(),
        record,
        progress: engine.calibration_progress(),
    }))
}

/// Starts a run driven by subsequent `/api/frames` posts.
async fn start_calibration(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut pipeline = state.pipeline().lock().await;
    if !pipeline.engine_mut().start_calibration() {
        return Err(AppError::conflict(
            "CALIBRATION_IN_PROGRESS",
            "A calibration run is already in progress",
        ));
    }
    let progress = pipeline.engine().calibration_progress();
    Ok(ok(progress))
}

async fn cancel_calibration(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut pipeline = state.pipeline().lock().await;
    let Some(outcome) = pipeline.engine_mut().cancel_calibration() else {
        return Err(AppError::not_found("No calibration in progress"));
    };
    tracing::info!(?outcome, "Calibration cancelled");
    pipeline.publish(TrackingEvent::Calibration {
        step: CalibrationStep::Finished(outcome.clone()),
    });
    Ok(ok(outcome))
}

/// Forgets the stored calibration; the cursor falls back to identity bounds.
async fn reset_calibration(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.store().clear_calibration()?;
    let mut pipeline = state.pipeline().lock().await;
    pipeline.engine_mut().set_bounds(None);
    tracing::info!("Calibration cleared");
    Ok(ok(serde_json::json!({ "calibrated": false })))
}
