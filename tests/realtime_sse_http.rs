mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, StatusCode};
use http_body_util::BodyExt;

use common::app::{spawn_test_server, spawn_with_sse_limit};
use common::fixtures::{frame_json, OPEN};
use common::http::{assert_json_error, call, request, response_json};

async fn next_chunk(body: &mut Body) -> String {
    let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
        .await
        .expect("sse frame in time")
        .expect("stream open")
        .expect("frame ok");
    let data = frame.into_data().expect("data frame");
    String::from_utf8(data.to_vec()).expect("utf8")
}

#[tokio::test]
async fn it_sse_endpoint_is_reachable() {
    let app = spawn_test_server().await;

    let response = request(&app.app, Method::GET, "/api/realtime/events", None, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(content_type.contains("text/event-stream"));
}

#[tokio::test]
async fn it_sse_streams_cursor_events() {
    let app = spawn_test_server().await;

    let response = request(&app.app, Method::GET, "/api/realtime/events", None, &[]).await;
    let mut body = response.into_body();
    assert!(next_chunk(&mut body).await.contains("event: ready"));

    let (status, _) = call(&app.app, Method::POST, "/api/frames", Some(frame_json(0, OPEN, 0.5))).await;
    assert_eq!(status, StatusCode::OK);

    let chunk = next_chunk(&mut body).await;
    assert!(chunk.contains("event: cursor"), "got {chunk}");
    assert!(chunk.contains("\"type\":\"cursor\""));
}

#[tokio::test]
async fn it_sse_connection_limit_is_enforced() {
    let app = spawn_with_sse_limit(1).await;

    let first = request(&app.app, Method::GET, "/api/realtime/events", None, &[]).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = request(&app.app, Method::GET, "/api/realtime/events", None, &[]).await;
    let (status, _, body) = response_json(second).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_json_error(&body, "RATE_LIMITED");

    drop(first);
    let third = request(&app.app, Method::GET, "/api/realtime/events", None, &[]).await;
    assert_eq!(third.status(), StatusCode::OK);
}

#[tokio::test]
async fn it_sse_closes_on_shutdown() {
    let app = spawn_test_server().await;

    let response = request(&app.app, Method::GET, "/api/realtime/events", None, &[]).await;
    let mut body = response.into_body();
    next_chunk(&mut body).await;

    app.shutdown_tx.send(()).unwrap();
    let end = tokio::time::timeout(Duration::from_secs(2), body.frame())
        .await
        .expect("stream ends in time");
    assert!(end.is_none());
}
