//! EAR (Eye Aspect Ratio): `(|p2-p6| + |p3-p5|) / (2 * |p1-p4|)`.

use super::types::Point;

/// Returned for degenerate input. Biased to "open" so that bad geometry
/// never produces a blink.
pub const DEGENERATE_EAR: f64 = 1.0;

/// Six eye points in anatomical order: outer corner, upper-1, upper-2,
/// inner corner, lower-2, lower-1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyePoints(pub [Point; 6]);

impl EyePoints {
    pub fn aspect_ratio(&self) -> f64 {
        eye_aspect_ratio(&self.0)
    }
}

/// EAR of one eye. Fewer than 6 points, a zero-width eye or a non-finite
/// result all yield [`DEGENERATE_EAR`].
pub fn eye_aspect_ratio(points: &[Point]) -> f64 {
    if points.len() < 6 {
        return DEGENERATE_EAR;
    }

    let horizontal = points[0].distance(&points[3]);
    if horizontal == 0.0 || !horizontal.is_finite() {
        return DEGENERATE_EAR;
    }

    let vertical1 = points[1].distance(&points[5]);
    let vertical2 = points[2].distance(&points[4]);
    let ear = (vertical1 + vertical2) / (2.0 * horizontal);

    if ear.is_finite() {
        ear
    } else {
        DEGENERATE_EAR
    }
}

/// Both-eye average used by the blink state machine.
pub fn binocular_ear(left: &EyePoints, right: &EyePoints) -> f64 {
    (left.aspect_ratio() + right.aspect_ratio()) / 2.0
}
