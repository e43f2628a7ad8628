mod common;

use axum::http::{Method, StatusCode};
use serde_json::Value;

use common::app::spawn_test_server;
use common::fixtures::{double_blink, sequence};
use common::http::{assert_json_error, assert_status_ok_json, call};

const FRAMES_PER_POINT: usize = 60;

/// Posts one fixate-then-double-blink batch per target. Returns the final
/// calibration step seen, if any.
async fn run_calibration(app: &axum::Router, gazes: &[f64]) -> Option<Value> {
    let mut finished = None;
    for (p, &g) in gazes.iter().enumerate() {
        let batch = sequence(p * FRAMES_PER_POINT, FRAMES_PER_POINT, g, double_blink);
        let (status, body) = call(app, Method::POST, "/api/frames/batch", Some(batch)).await;
        assert_status_ok_json(status, &body);

        for out in body["data"].as_array().unwrap() {
            assert_eq!(out["actions"]["rightClick"], false);
            if out["calibration"]["phase"] == "finished" {
                finished = Some(out["calibration"]["data"].clone());
            }
        }
    }
    finished
}

#[tokio::test]
async fn it_start_twice_conflicts() {
    let app = spawn_test_server().await;

    let (status, body) = call(&app.app, Method::POST, "/api/calibration/start", None).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["point"], 0);
    assert_eq!(body["data"]["total"], 5);
    assert_eq!(body["data"]["target"]["label"], "Top-Left");

    let (status, body) = call(&app.app, Method::POST, "/api/calibration/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_json_error(&body, "CALIBRATION_IN_PROGRESS");
}

#[tokio::test]
async fn it_cancel_reports_failure_and_keeps_uncalibrated() {
    let app = spawn_test_server().await;

    call(&app.app, Method::POST, "/api/calibration/start", None).await;
    let (status, body) = call(&app.app, Method::POST, "/api/calibration/cancel", None).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["status"], "failed");
    assert_eq!(body["data"]["detail"]["kind"], "cancelled");

    let (status, body) = call(&app.app, Method::POST, "/api/calibration/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "NOT_FOUND");

    let (_, body) = call(&app.app, Method::GET, "/api/calibration", None).await;
    assert_eq!(body["data"]["calibrated"], false);
    assert_eq!(body["data"]["calibrating"], false);
    assert!(body["data"]["record"].is_null());
}

#[tokio::test]
async fn it_full_run_is_persisted_and_resettable() {
    let app = spawn_test_server().await;

    call(&app.app, Method::POST, "/api/calibration/start", None).await;
    let (_, status_body) = call(&app.app, Method::GET, "/api/calibration", None).await;
    assert_eq!(status_body["data"]["calibrating"], true);

    let finished = run_calibration(&app.app, &[0.2, 0.8, 0.8, 0.2, 0.5])
        .await
        .expect("calibration finished");
    assert_eq!(finished["status"], "completed");
    let min_x = finished["detail"]["minX"].as_f64().unwrap();
    let max_x = finished["detail"]["maxX"].as_f64().unwrap();
    assert!(min_x < max_x);

    let (_, body) = call(&app.app, Method::GET, "/api/calibration", None).await;
    assert_eq!(body["data"]["calibrated"], true);
    assert_eq!(body["data"]["record"]["calibrated"], true);
    assert!(body["data"]["record"]["calibratedAt"].is_string());
    assert!(app.state.store().load_calibration().unwrap().is_some());

    let (status, body) = call(&app.app, Method::DELETE, "/api/calibration", None).await;
    assert_status_ok_json(status, &body);
    let (_, body) = call(&app.app, Method::GET, "/api/calibration", None).await;
    assert_eq!(body["data"]["calibrated"], false);
    assert!(app.state.store().load_calibration().unwrap().is_none());
}
