use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;

use crate::constants::MAX_BATCH_FRAMES;
use crate::extractors::JsonBody;
use crate::pipeline::Pipeline;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::tracking::{CalibrationRecord, FrameOutput, FrameRecord};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(ingest_frame))
        .route("/batch", post(ingest_batch))
}

async fn ingest_frame(
    State(state): State<AppState>,
    JsonBody(record): JsonBody<FrameRecord>,
) -> Result<impl IntoResponse, AppError> {
    let output = {
        let mut pipeline = state.pipeline().lock().await;
        run_frame(&state, &mut pipeline, record)
    };
    persist_completed_calibration(&state, &output);
    Ok(ok(output))
}

async fn ingest_batch(
    State(state): State<AppState>,
    JsonBody(records): JsonBody<Vec<FrameRecord>>,
) -> Result<impl IntoResponse, AppError> {
    if records.len() > MAX_BATCH_FRAMES {
        return Err(AppError::bad_request(
            "BATCH_TOO_LARGE",
            &format!("At most {MAX_BATCH_FRAMES} frames per batch"),
        ));
    }

    let outputs: Vec<FrameOutput> = {
        let mut pipeline = state.pipeline().lock().await;
        records
            .into_iter()
            .map(|record| run_frame(&state, &mut pipeline, record))
            .collect()
    };
    for output in &outputs {
        persist_completed_calibration(&state, output);
    }
    Ok(ok(outputs))
}

fn run_frame(state: &AppState, pipeline: &mut Pipeline, record: FrameRecord) -> FrameOutput {
    let now = record.timestamp_secs().unwrap_or_else(|| state.clock_secs());
    pipeline.process(&record.into_observation(), now)
}

/// A failed write is logged; the engine already uses the new bounds.
fn persist_completed_calibration(state: &AppState, output: &FrameOutput) {
    let Some(bounds) = Pipeline::completed_bounds(output) else {
        return;
    };
    match state
        .store()
        .save_calibration(&CalibrationRecord::from_bounds(bounds))
    {
        Ok(()) => tracing::info!(?bounds, "Calibration saved"),
        Err(e) => tracing::error!(error = %e, "Failed to persist calibration"),
    }
}
