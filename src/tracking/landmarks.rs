//! Adapter between a face-mesh model's raw landmark list and the anatomical
//! point groups used by the rest of the pipeline. Nothing outside this
//! module knows a landmark index.

use super::ear::EyePoints;
use super::types::{LandmarkFrame, Point};

/// Anatomical point groups of one eye.
#[derive(Debug, Clone, PartialEq)]
pub struct EyeRegion {
    /// EAR points, scaled to frame pixels.
    pub ear_points: EyePoints,
    /// Corner, lid and iris points below stay normalized.
    pub inner_corner: Point,
    pub outer_corner: Point,
    pub upper_lid: Vec<Point>,
    pub lower_lid: Vec<Point>,
    pub iris: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EyePair {
    pub left: EyeRegion,
    pub right: EyeRegion,
}

pub trait FaceLayout: Send + Sync {
    fn required_points(&self) -> usize;

    fn eyes(&self, frame: &LandmarkFrame) -> Option<EyePair>;

    fn nose_tip(&self, frame: &LandmarkFrame) -> Option<Point>;
}

/// Index table for one eye of a specific model.
#[derive(Debug, Clone, Copy)]
pub struct EyeIndices {
    pub ear: [usize; 6],
    pub inner_corner: usize,
    pub outer_corner: usize,
    pub upper_lid: [usize; 3],
    pub lower_lid: [usize; 3],
    pub iris: [usize; 5],
}

/// MediaPipe Face Mesh with refined landmarks (478 points, iris included).
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaPipeFaceMesh;

impl MediaPipeFaceMesh {
    pub const POINT_COUNT: usize = 478;
    pub const NOSE_TIP: usize = 1;

    pub const LEFT_EYE: EyeIndices = EyeIndices {
        ear: [33, 160, 158, 133, 153, 144],
        inner_corner: 133,
        outer_corner: 33,
        upper_lid: [159, 160, 161],
        lower_lid: [145, 144, 153],
        iris: [468, 469, 470, 471, 472],
    };

    pub const RIGHT_EYE: EyeIndices = EyeIndices {
        ear: [362, 385, 387, 263, 373, 380],
        inner_corner: 362,
        outer_corner: 263,
        upper_lid: [386, 385, 387],
        lower_lid: [374, 373, 380],
        iris: [473, 474, 475, 476, 477],
    };
}

fn gather<const N: usize>(frame: &LandmarkFrame, indices: &[usize; N]) -> Option<Vec<Point>> {
    indices.iter().map(|&i| frame.point(i)).collect()
}

fn eye_region(frame: &LandmarkFrame, indices: &EyeIndices) -> Option<EyeRegion> {
    let sx = f64::from(frame.width.max(1));
    let sy = f64::from(frame.height.max(1));

    let ear = gather(frame, &indices.ear)?;
    let mut scaled = [Point::default(); 6];
    for (slot, point) in scaled.iter_mut().zip(ear.iter()) {
        *slot = point.scaled(sx, sy);
    }

    Some(EyeRegion {
        ear_points: EyePoints(scaled),
        inner_corner: frame.point(indices.inner_corner)?,
        outer_corner: frame.point(indices.outer_corner)?,
        upper_lid: gather(frame, &indices.upper_lid)?,
        lower_lid: gather(frame, &indices.lower_lid)?,
        iris: gather(frame, &indices.iris)?,
    })
}

impl FaceLayout for MediaPipeFaceMesh {
    fn required_points(&self) -> usize {
        Self::POINT_COUNT
    }

    fn eyes(&self, frame: &LandmarkFrame) -> Option<EyePair> {
        if frame.points.len() < self.required_points() {
            tracing::debug!(
                got = frame.points.len(),
                need = self.required_points(),
                "Landmark frame too short for layout"
            );
            return None;
        }
        Some(EyePair {
            left: eye_region(frame, &Self::LEFT_EYE)?,
            right: eye_region(frame, &Self::RIGHT_EYE)?,
        })
    }

    fn nose_tip(&self, frame: &LandmarkFrame) -> Option<Point> {
        frame.point(Self::NOSE_TIP)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A full-size mesh with every point at `fill`.
    pub(crate) fn mesh_filled(fill: Point) -> LandmarkFrame {
        LandmarkFrame::new(vec![fill; MediaPipeFaceMesh::POINT_COUNT], 640, 480)
    }

    #[test]
    fn short_frame_has_no_eyes() {
        let frame = LandmarkFrame::new(vec![Point::new(0.5, 0.5); 68], 640, 480);
        assert!(MediaPipeFaceMesh.eyes(&frame).is_none());
    }

    #[test]
    fn ear_points_are_scaled_to_pixels() {
        let mut frame = mesh_filled(Point::new(0.5, 0.5));
        frame.points[33] = Point::new(0.25, 0.5);
        let eyes = MediaPipeFaceMesh.eyes(&frame).expect("eyes");
        assert_eq!(eyes.left.ear_points.0[0], Point::new(160.0, 240.0));
        assert_eq!(eyes.left.outer_corner, Point::new(0.25, 0.5));
        assert_eq!(eyes.left.iris.len(), 5);
        assert_eq!(eyes.right.upper_lid.len(), 3);
    }

    #[test]
    fn nose_tip_is_read_from_index_one() {
        let mut frame = mesh_filled(Point::new(0.5, 0.5));
        frame.points[1] = Point::new(0.4, 0.6);
        assert_eq!(MediaPipeFaceMesh.nose_tip(&frame), Some(Point::new(0.4, 0.6)));
    }
}
