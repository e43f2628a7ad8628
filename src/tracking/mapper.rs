//! Smoothed gaze → calibrated screen pixel.

use super::calibration::CalibrationBounds;
use super::config::CursorConfig;
use super::types::{CursorTarget, GazeSample};

/// Rescales a gaze ratio into `[0,1]` screen space through the bounds.
pub fn normalize(gaze: GazeSample, bounds: &CalibrationBounds) -> (f64, f64) {
    (
        normalize_axis(gaze.x, bounds.min_x, bounds.max_x),
        normalize_axis(gaze.y, bounds.min_y, bounds.max_y),
    )
}

fn normalize_axis(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span <= 0.0 || !span.is_finite() || !value.is_finite() {
        return 0.5;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

/// `round(normalized * (dimension - 1))`: 0 maps to pixel 0, 1 to the last pixel.
pub fn to_pixel(normalized: f64, dimension: u32) -> i32 {
    let last = f64::from(dimension.saturating_sub(1));
    (normalized.clamp(0.0, 1.0) * last).round() as i32
}

#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    config: CursorConfig,
    previous: Option<(i32, i32)>,
}

impl CoordinateMapper {
    pub fn new(config: CursorConfig) -> Self {
        Self {
            config,
            previous: None,
        }
    }

    /// Maps one smoothed gaze sample and blends it with the previous target.
    pub fn map(&mut self, gaze: GazeSample, bounds: &CalibrationBounds) -> CursorTarget {
        let (nx, ny) = normalize(gaze, bounds);
        let px = to_pixel(nx, self.config.screen_width);
        let py = to_pixel(ny, self.config.screen_height);

        let (x, y) = match self.previous {
            Some((prev_x, prev_y)) => {
                let a = self.config.smoothing_factor;
                (
                    (a * f64::from(prev_x) + (1.0 - a) * f64::from(px)).round() as i32,
                    (a * f64::from(prev_y) + (1.0 - a) * f64::from(py)).round() as i32,
                )
            }
            None => (px, py),
        };
        self.previous = Some((x, y));

        CursorTarget {
            x,
            y,
            normalized_x: nx,
            normalized_y: ny,
        }
    }

    pub fn config(&self) -> &CursorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: CursorConfig) {
        if config.screen_width != self.config.screen_width || config.screen_height != self.config.screen_height {
            self.previous = None;
        }
        self.config = config;
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}
