//! Gaze extraction: iris position inside the eye socket, or nose-tip
//! position in head-tracking mode.

use super::config::GazeMode;
use super::landmarks::{EyePair, EyeRegion, FaceLayout};
use super::types::{GazeSample, LandmarkFrame, Point};

/// Neutral ratio used whenever geometry is degenerate.
pub const NEUTRAL_RATIO: f64 = 0.5;

const EDGE_EXPONENT: f64 = 0.8;

/// Edge-enhancing remap of a `[0,1]` ratio. Flattens the centre and widens
/// the ends so the cursor reaches screen edges without extreme eye rotation.
pub fn edge_remap(value: f64) -> f64 {
    if !value.is_finite() {
        return NEUTRAL_RATIO;
    }
    let v = value.clamp(0.0, 1.0);
    let out = if v < 0.5 {
        0.5 * (2.0 * v).powf(EDGE_EXPONENT)
    } else {
        0.5 + 0.5 * (2.0 * (v - 0.5)).powf(EDGE_EXPONENT)
    };
    finite_or_neutral(out)
}

fn finite_or_neutral(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        NEUTRAL_RATIO
    }
}

/// `(value - origin) / |end - start|`, clamped and remapped. Zero span is neutral.
fn axis_ratio(value: f64, origin: f64, start: f64, end: f64) -> f64 {
    let span = (end - start).abs();
    if span == 0.0 || !span.is_finite() {
        return NEUTRAL_RATIO;
    }
    let raw = ((value - origin) / span).clamp(0.0, 1.0);
    finite_or_neutral(edge_remap(raw).clamp(0.0, 1.0))
}

/// Gaze ratio of a single eye.
pub fn eye_gaze(eye: &EyeRegion) -> GazeSample {
    let Some(iris) = Point::centroid(&eye.iris) else {
        return GazeSample::CENTER;
    };

    // Origin is the leftmost corner, not the inner one, so both eyes share
    // the image x direction. The left eye's inner corner is its right corner.
    let (inner, outer) = (eye.inner_corner.x, eye.outer_corner.x);
    let x = axis_ratio(iris.x, inner.min(outer), inner, outer);

    let y = match (
        Point::centroid(&eye.upper_lid),
        Point::centroid(&eye.lower_lid),
    ) {
        (Some(upper), Some(lower)) => axis_ratio(iris.y, upper.y, upper.y, lower.y),
        _ => NEUTRAL_RATIO,
    };

    GazeSample::new(x, y)
}

/// Average of both eyes' gaze ratios.
pub fn binocular_gaze(eyes: &EyePair) -> GazeSample {
    let left = eye_gaze(&eyes.left);
    let right = eye_gaze(&eyes.right);
    GazeSample::new((left.x + right.x) / 2.0, (left.y + right.y) / 2.0)
}

/// Head-pointing sample: the nose tip itself, clamped, no remap.
pub fn nose_gaze(nose: Point) -> GazeSample {
    GazeSample::new(
        finite_or_neutral(nose.x).clamp(0.0, 1.0),
        finite_or_neutral(nose.y).clamp(0.0, 1.0),
    )
}

/// Per-frame raw gaze sample for the configured mode, `None` when the
/// layout cannot read the frame.
pub fn extract(layout: &dyn FaceLayout, frame: &LandmarkFrame, mode: GazeMode) -> Option<GazeSample> {
    match mode {
        GazeMode::Iris => layout.eyes(frame).map(|eyes| binocular_gaze(&eyes)),
        GazeMode::Nose => layout.nose_tip(frame).map(nose_gaze),
    }
}
