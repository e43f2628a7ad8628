use gaze_blink_control::tracking::{CalibrationBounds, CalibrationRecord, FrameRecord, TrackingConfig};

#[test]
fn pt_calibration_record_roundtrip() {
    let record = CalibrationRecord::from_bounds(CalibrationBounds {
        min_x: 0.31,
        max_x: 0.72,
        min_y: 0.28,
        max_y: 0.66,
    });
    let encoded = serde_json::to_string(&record).expect("serialize record");
    assert!(encoded.contains("\"minX\""));
    assert!(encoded.contains("\"calibratedAt\""));
    let decoded: CalibrationRecord = serde_json::from_str(&encoded).expect("deserialize record");
    assert_eq!(decoded, record);
    assert!(decoded.into_bounds().is_some());
}

#[test]
fn pt_legacy_record_without_timestamp_loads() {
    let raw = r#"{"minX":0.3,"maxX":0.7,"minY":0.3,"maxY":0.7,"calibrated":true}"#;
    let record: CalibrationRecord = serde_json::from_str(raw).expect("deserialize record");
    assert!(record.calibrated_at.is_none());
    assert!(record.into_bounds().is_some());
}

#[test]
fn pt_uncalibrated_or_inverted_record_has_no_bounds() {
    let raw = r#"{"minX":0.3,"maxX":0.7,"minY":0.3,"maxY":0.7,"calibrated":false}"#;
    let record: CalibrationRecord = serde_json::from_str(raw).unwrap();
    assert!(record.into_bounds().is_none());

    let raw = r#"{"minX":0.7,"maxX":0.3,"minY":0.3,"maxY":0.7,"calibrated":true}"#;
    let record: CalibrationRecord = serde_json::from_str(raw).unwrap();
    assert!(record.into_bounds().is_none());
}

#[test]
fn pt_tracking_config_roundtrip() {
    let mut config = TrackingConfig::default();
    config.edge_scroll.enabled = true;
    config.cursor.screen_width = 2560;
    let encoded = serde_json::to_string(&config).expect("serialize config");
    assert!(encoded.contains("\"edgeScroll\""));
    let decoded: TrackingConfig = serde_json::from_str(&encoded).expect("deserialize config");
    assert_eq!(decoded, config);
}

#[test]
fn pt_frame_record_roundtrip() {
    let raw = r#"{"timestampMs":40.0,"face":{"points":[[0.25,0.5],[0.75,0.5]],"width":1280,"height":720}}"#;
    let record: FrameRecord = serde_json::from_str(raw).expect("deserialize frame");
    let encoded = serde_json::to_value(&record).expect("serialize frame");
    assert_eq!(encoded["face"]["points"][1][0], 0.75);
    assert_eq!(encoded["face"]["width"], 1280);
}
