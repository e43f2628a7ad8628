use serde::{Deserialize, Serialize};

use super::blink::BlinkEvent;
use super::calibration::CalibrationStep;
use super::pattern::PendingGesture;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn scaled(&self, sx: f64, sy: f64) -> Point {
        Point::new(self.x * sx, self.y * sy)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn centroid(points: &[Point]) -> Option<Point> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(ax, ay), p| (ax + p.x, ay + p.y));
        Some(Point::new(sx / n, sy / n))
    }
}

impl From<[f64; 2]> for Point {
    fn from(value: [f64; 2]) -> Self {
        Point::new(value[0], value[1])
    }
}

impl From<Point> for [f64; 2] {
    fn from(value: Point) -> Self {
        [value.x, value.y]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkFrame {
    pub points: Vec<Point>,
    pub width: u32,
    pub height: u32,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Point>, width: u32, height: u32) -> Self {
        Self {
            points,
            width,
            height,
        }
    }

    pub fn point(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }
}

/// Per-frame input at the core boundary. "No face" is a first-class value.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceObservation {
    NoFace,
    Face(LandmarkFrame),
}

impl FaceObservation {
    pub fn face(&self) -> Option<&LandmarkFrame> {
        match self {
            FaceObservation::Face(frame) => Some(frame),
            FaceObservation::NoFace => None,
        }
    }
}

impl From<Option<LandmarkFrame>> for FaceObservation {
    fn from(value: Option<LandmarkFrame>) -> Self {
        match value {
            Some(frame) => FaceObservation::Face(frame),
            None => FaceObservation::NoFace,
        }
    }
}

/// Wire form of one frame, as posted to the server or stored one per line
/// in a recording: `{"timestampMs": 1234.5, "face": null | {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<f64>,
    #[serde(default)]
    pub face: Option<LandmarkFrame>,
}

impl FrameRecord {
    pub fn timestamp_secs(&self) -> Option<f64> {
        self.timestamp_ms.filter(|ms| ms.is_finite()).map(|ms| ms / 1000.0)
    }

    pub fn into_observation(self) -> FaceObservation {
        self.face.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
}

impl GazeSample {
    pub const CENTER: GazeSample = GazeSample { x: 0.5, y: 0.5 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
    Double,
    Triple,
    Quadruple,
    Quintuple,
}

impl GestureKind {
    pub fn blink_count(self) -> usize {
        match self {
            Self::Double => 2,
            Self::Triple => 3,
            Self::Quadruple => 4,
            Self::Quintuple => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Triple => "triple",
            Self::Quadruple => "quadruple",
            Self::Quintuple => "quintuple",
        }
    }

    /// The mouse action bound to this gesture.
    pub fn action(self) -> FrameActions {
        let mut actions = FrameActions::default();
        match self {
            Self::Double => actions.right_click = true,
            Self::Triple => actions.left_click = true,
            Self::Quadruple => actions.drag_toggle = true,
            Self::Quintuple => actions.middle_click = true,
        }
        actions
    }
}

/// Per-frame action flags. At most one field is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameActions {
    pub left_click: bool,
    pub right_click: bool,
    pub middle_click: bool,
    pub drag_toggle: bool,
    pub scroll_up: bool,
    pub scroll_down: bool,
}

impl FrameActions {
    pub fn any(&self) -> bool {
        self.count() > 0
    }

    pub fn count(&self) -> usize {
        [
            self.left_click,
            self.right_click,
            self.middle_click,
            self.drag_toggle,
            self.scroll_up,
            self.scroll_down,
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorTarget {
    pub x: i32,
    pub y: i32,
    /// Calibrated position before pixel conversion, in `[0,1]`.
    pub normalized_x: f64,
    pub normalized_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameOutput {
    /// Frame time after the monotonic clamp, in seconds.
    pub timestamp: f64,
    pub face_detected: bool,
    pub ear: Option<f64>,
    pub gaze: Option<GazeSample>,
    pub cursor: Option<CursorTarget>,
    pub actions: FrameActions,
    pub gesture: Option<GestureKind>,
    pub blink: Option<BlinkEvent>,
    /// Blinks currently held in the pattern sequence.
    pub blink_count: usize,
    pub pending: Option<PendingGesture>,
    pub calibration: Option<CalibrationStep>,
}

impl FrameOutput {
    pub fn empty(timestamp: f64) -> Self {
        Self {
            timestamp,
            face_detected: false,
            ear: None,
            gaze: None,
            cursor: None,
            actions: FrameActions::default(),
            gesture: None,
            blink: None,
            blink_count: 0,
            pending: None,
            calibration: None,
        }
    }
}
