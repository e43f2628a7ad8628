use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{extract::State, Router};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::constants::SSE_KEEPALIVE_SECS;
use crate::response::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/events", get(sse_handler))
}

pub async fn sse_handler(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let Some(slot) = state.try_acquire_sse() else {
        return Err(AppError::too_many_requests("Too many SSE connections"));
    };

    let mut events = state.subscribe_events();
    let mut shutdown_rx = state.shutdown_rx();

    let stream = async_stream::stream! {
        let _slot = slot;
        yield Ok(Event::default().event("ready").data("{}"));

        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => yield Ok(Event::default().event(event.name()).data(json)),
                        Err(e) => tracing::warn!(error = %e, "Failed to encode tracking event"),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "SSE subscriber lagging, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown_rx.recv() => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEPALIVE_SECS))
            .text("keepalive"),
    ))
}
