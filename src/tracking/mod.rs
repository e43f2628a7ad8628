pub mod blink;
pub mod calibration;
pub mod config;
pub mod ear;
pub mod edge_scroll;
pub mod engine;
pub mod gaze;
pub mod landmarks;
pub mod mapper;
pub mod pattern;
pub mod smoothing;
pub mod types;

pub use calibration::{CalibrationBounds, CalibrationOutcome, CalibrationRecord};
pub use config::TrackingConfig;
pub use engine::TrackingEngine;
pub use types::{FaceObservation, FrameActions, FrameOutput, FrameRecord, GestureKind, LandmarkFrame};
