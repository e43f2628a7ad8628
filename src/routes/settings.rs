use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::tracking::TrackingConfig;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    let pipeline = state.pipeline().lock().await;
    ok(pipeline.engine().config().clone())
}

/// Deep-merges `patch` over the current settings, then validates, persists
/// and hot-reloads the result. Nothing changes if validation fails.
async fn update_settings(
    State(state): State<AppState>,
    JsonBody(patch): JsonBody<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    if !patch.is_object() {
        return Err(AppError::bad_request(
            "INVALID_SETTINGS",
            "Settings patch must be a JSON object",
        ));
    }

    let mut pipeline = state.pipeline().lock().await;
    let mut merged = serde_json::to_value(pipeline.engine().config())
        .map_err(|e| AppError::internal(&e.to_string()))?;
    merge_json(&mut merged, patch);

    let next: TrackingConfig = serde_json::from_value(merged)
        .map_err(|e| AppError::bad_request("INVALID_SETTINGS", &e.to_string()))?;
    next.validate()
        .map_err(|reason| AppError::bad_request("INVALID_SETTINGS", &reason))?;

    state.store().save_settings(&next)?;
    pipeline
        .reload_config(next)
        .map_err(|reason| AppError::bad_request("INVALID_SETTINGS", &reason))?;

    Ok(ok(pipeline.engine().config().clone()))
}

fn merge_json(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}
