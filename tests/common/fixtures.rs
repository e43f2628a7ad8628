use serde_json::{json, Value};

use gaze_blink_control::tracking::landmarks::{EyeIndices, MediaPipeFaceMesh};
use gaze_blink_control::tracking::types::{LandmarkFrame, Point};

pub const FRAME_MS: f64 = 1000.0 / 30.0;
/// Lid half-opening giving EAR 0.3 on a 640x480 frame.
pub const OPEN: f64 = 0.012;
pub const CLOSED: f64 = 0.001;

fn place_eye(points: &mut [Point], eye: &EyeIndices, outer_x: f64, inner_x: f64, half: f64, gaze_x: f64) {
    let cy = 0.45;
    let (lo, hi) = (outer_x.min(inner_x), outer_x.max(inner_x));
    let mid = (lo + hi) / 2.0;
    points[eye.outer_corner] = Point::new(outer_x, cy);
    points[eye.inner_corner] = Point::new(inner_x, cy);
    for &i in eye.upper_lid.iter().chain([eye.ear[1], eye.ear[2]].iter()) {
        points[i] = Point::new(mid, cy - half);
    }
    for &i in eye.lower_lid.iter().chain([eye.ear[4], eye.ear[5]].iter()) {
        points[i] = Point::new(mid, cy + half);
    }
    for &i in &eye.iris {
        points[i] = Point::new(lo + gaze_x * (hi - lo), cy);
    }
}

/// A full 478-point mesh with both irises at `gaze_x` across the eye.
pub fn face(half: f64, gaze_x: f64) -> LandmarkFrame {
    let mut points = vec![Point::new(0.5, 0.5); MediaPipeFaceMesh::POINT_COUNT];
    place_eye(&mut points, &MediaPipeFaceMesh::LEFT_EYE, 0.37, 0.43, half, gaze_x);
    place_eye(&mut points, &MediaPipeFaceMesh::RIGHT_EYE, 0.63, 0.57, half, gaze_x);
    LandmarkFrame::new(points, 640, 480)
}

pub fn frame_json(index: usize, half: f64, gaze_x: f64) -> Value {
    json!({
        "timestampMs": index as f64 * FRAME_MS,
        "face": face(half, gaze_x),
    })
}

pub fn no_face_json(index: usize) -> Value {
    json!({ "timestampMs": index as f64 * FRAME_MS, "face": null })
}

/// `count` frames starting at `start`, eyes closed where `closed(k)` holds.
pub fn sequence(start: usize, count: usize, gaze_x: f64, closed: impl Fn(usize) -> bool) -> Value {
    Value::Array(
        (0..count)
            .map(|k| frame_json(start + k, if closed(k) { CLOSED } else { OPEN }, gaze_x))
            .collect(),
    )
}

/// Two 3-frame closures, reopening 0.3 s apart.
pub fn double_blink(k: usize) -> bool {
    (15..18).contains(&k) || (24..27).contains(&k)
}
