//! Five-point gaze calibration. A double or triple blink confirms a point.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::CalibrationConfig;
use super::engine::TrackingEngine;
use super::types::{FaceObservation, GazeSample, GestureKind, Point};

pub const POINT_COUNT: usize = 5;

const LABELS: [&str; POINT_COUNT] = [
    "Top-Left",
    "Top-Right",
    "Bottom-Right",
    "Bottom-Left",
    "Center",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationTarget {
    pub label: &'static str,
    pub screen: Point,
}

/// Four inset corners, clockwise from top-left, then the centre.
pub fn targets(inset: f64) -> [CalibrationTarget; POINT_COUNT] {
    let lo = inset;
    let hi = 1.0 - inset;
    let positions = [
        Point::new(lo, lo),
        Point::new(hi, lo),
        Point::new(hi, hi),
        Point::new(lo, hi),
        Point::new(0.5, 0.5),
    ];
    std::array::from_fn(|i| CalibrationTarget {
        label: LABELS[i],
        screen: positions[i],
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for CalibrationBounds {
    /// Identity mapping, used when nothing is calibrated.
    fn default() -> Self {
        Self {
            min_x: 0.0,
            max_x: 1.0,
            min_y: 0.0,
            max_y: 1.0,
        }
    }
}

impl CalibrationBounds {
    pub fn is_valid(&self) -> bool {
        let axis_ok = |lo: f64, hi: f64| {
            lo.is_finite() && hi.is_finite() && (0.0..=1.0).contains(&lo) && (0.0..=1.0).contains(&hi) && hi > lo
        };
        axis_ok(self.min_x, self.max_x) && axis_ok(self.min_y, self.max_y)
    }
}

fn axis_bounds(values: impl Iterator<Item = f64> + Clone, config: &CalibrationConfig, axis: &str) -> (f64, f64) {
    let lo = values.clone().fold(f64::INFINITY, f64::min);
    let hi = values.fold(f64::NEG_INFINITY, f64::max);
    let min = (lo - config.margin).clamp(0.0, 1.0);
    let max = (hi + config.margin).clamp(0.0, 1.0);

    // Both the observed spread and the widened range must clear `min_range`.
    let spread = hi - lo;
    if !spread.is_finite() || spread < config.min_range || max - min < config.min_range {
        tracing::warn!(
            axis,
            spread,
            fallback_min = config.fallback_min,
            fallback_max = config.fallback_max,
            "Calibration range too narrow, using fallback"
        );
        return (config.fallback_min, config.fallback_max);
    }
    (min, max)
}

/// Bounds from the per-point averages: min/max, widened by the margin,
/// clamped to `[0,1]`, narrow axes replaced by the fallback range.
/// No averages at all yields the identity bounds.
pub fn derive_bounds(averages: &[GazeSample], config: &CalibrationConfig) -> CalibrationBounds {
    if averages.is_empty() {
        tracing::warn!("No calibration averages, using identity bounds");
        return CalibrationBounds::default();
    }
    let (min_x, max_x) = axis_bounds(averages.iter().map(|s| s.x), config, "x");
    let (min_y, max_y) = axis_bounds(averages.iter().map(|s| s.y), config, "y");
    CalibrationBounds {
        min_x,
        max_x,
        min_y,
        max_y,
    }
}

/// Persisted form of a calibration, stored and restored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRecord {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub calibrated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibrated_at: Option<DateTime<Utc>>,
}

impl CalibrationRecord {
    pub fn from_bounds(bounds: CalibrationBounds) -> Self {
        Self {
            min_x: bounds.min_x,
            max_x: bounds.max_x,
            min_y: bounds.min_y,
            max_y: bounds.max_y,
            calibrated: true,
            calibrated_at: Some(Utc::now()),
        }
    }

    /// Usable bounds, or `None` for an uncalibrated or corrupt record.
    pub fn into_bounds(self) -> Option<CalibrationBounds> {
        if !self.calibrated {
            return None;
        }
        let bounds = CalibrationBounds {
            min_x: self.min_x,
            max_x: self.max_x,
            min_y: self.min_y,
            max_y: self.max_y,
        };
        if bounds.is_valid() {
            Some(bounds)
        } else {
            tracing::warn!(?bounds, "Ignoring invalid calibration record");
            None
        }
    }
}

/// Why a calibration run stopped. `point` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CalibrationFailure {
    #[error("timed out waiting for confirmation at point {}", .point + 1)]
    Timeout { point: usize },
    #[error("cancelled at point {}", .point + 1)]
    Cancelled { point: usize },
    #[error("landmark source ended at point {}", .point + 1)]
    SourceEnded { point: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum CalibrationOutcome {
    Completed(CalibrationBounds),
    Failed(CalibrationFailure),
}

impl CalibrationOutcome {
    pub fn bounds(&self) -> Option<CalibrationBounds> {
        match self {
            Self::Completed(bounds) => Some(*bounds),
            Self::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationProgress {
    pub point: usize,
    pub total: usize,
    pub target: CalibrationTarget,
    pub samples: usize,
    pub min_samples: usize,
    pub elapsed_secs: f64,
    pub timeout_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", content = "data", rename_all = "camelCase")]
pub enum CalibrationStep {
    Collecting(CalibrationProgress),
    PointCaptured {
        point: usize,
        average: GazeSample,
    },
    Finished(CalibrationOutcome),
}

#[derive(Debug, Clone)]
pub struct CalibrationSession {
    config: CalibrationConfig,
    targets: [CalibrationTarget; POINT_COUNT],
    current: usize,
    point_started: Option<f64>,
    samples: VecDeque<GazeSample>,
    averages: Vec<GazeSample>,
}

impl CalibrationSession {
    pub fn new(config: CalibrationConfig) -> Self {
        let targets = targets(config.target_inset);
        tracing::info!(points = POINT_COUNT, "Calibration started");
        Self {
            samples: VecDeque::with_capacity(config.sample_window),
            config,
            targets,
            current: 0,
            point_started: None,
            averages: Vec::with_capacity(POINT_COUNT),
        }
    }

    pub fn current_point(&self) -> usize {
        self.current
    }

    pub fn targets(&self) -> &[CalibrationTarget; POINT_COUNT] {
        &self.targets
    }

    pub fn progress(&self, now: f64) -> CalibrationProgress {
        let elapsed_secs = self.point_started.map(|s| (now - s).max(0.0)).unwrap_or(0.0);
        CalibrationProgress {
            point: self.current,
            total: POINT_COUNT,
            target: self.targets[self.current.min(POINT_COUNT - 1)],
            samples: self.samples.len(),
            min_samples: self.config.min_samples,
            elapsed_secs,
            timeout_secs: self.config.point_timeout_secs,
        }
    }

    /// Advances by one frame. `sample` is the smoothed gaze when a face was
    /// seen, `gesture` the blink gesture fired this frame, if any.
    pub fn step(&mut self, sample: Option<GazeSample>, gesture: Option<GestureKind>, now: f64) -> CalibrationStep {
        let started = *self.point_started.get_or_insert(now);

        if now - started >= self.config.point_timeout_secs {
            let failure = CalibrationFailure::Timeout { point: self.current };
            tracing::warn!(label = self.targets[self.current].label, "Calibration point timed out");
            return CalibrationStep::Finished(CalibrationOutcome::Failed(failure));
        }

        if let Some(sample) = sample {
            self.samples.push_back(sample);
            while self.samples.len() > self.config.sample_window {
                self.samples.pop_front();
            }
        }

        let confirmed = matches!(gesture, Some(GestureKind::Double | GestureKind::Triple));
        if confirmed && self.samples.len() >= self.config.min_samples {
            return self.capture(now);
        }
        if confirmed {
            tracing::debug!(
                samples = self.samples.len(),
                need = self.config.min_samples,
                "Confirmation ignored, not enough samples"
            );
        }

        CalibrationStep::Collecting(self.progress(now))
    }

    fn capture(&mut self, now: f64) -> CalibrationStep {
        let n = self.samples.len() as f64;
        let (sx, sy) = self
            .samples
            .iter()
            .fold((0.0, 0.0), |(ax, ay), s| (ax + s.x, ay + s.y));
        let average = GazeSample::new(sx / n, sy / n);
        let point = self.current;
        tracing::info!(
            point = point + 1,
            label = self.targets[point].label,
            x = average.x,
            y = average.y,
            "Calibration point captured"
        );

        self.averages.push(average);
        self.samples.clear();
        self.current += 1;
        self.point_started = Some(now);

        if self.current < POINT_COUNT {
            return CalibrationStep::PointCaptured { point, average };
        }

        let bounds = derive_bounds(&self.averages, &self.config);
        tracing::info!(?bounds, "Calibration complete");
        CalibrationStep::Finished(CalibrationOutcome::Completed(bounds))
    }

    pub fn cancel(&self) -> CalibrationOutcome {
        tracing::info!(point = self.current + 1, "Calibration cancelled");
        CalibrationOutcome::Failed(CalibrationFailure::Cancelled { point: self.current })
    }

    pub fn source_ended(&self) -> CalibrationOutcome {
        tracing::warn!(point = self.current + 1, "Landmark source ended during calibration");
        CalibrationOutcome::Failed(CalibrationFailure::SourceEnded { point: self.current })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame at line {line}: {message}")]
    Malformed { line: usize, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimedObservation {
    pub timestamp: f64,
    pub observation: FaceObservation,
}

/// Blocking per-frame landmark producer. `Ok(None)` ends the stream.
pub trait LandmarkSource {
    fn next_frame(&mut self) -> Result<Option<TimedObservation>, SourceError>;
}

/// Runs a full calibration, reading frames from `source` until it finishes,
/// the source ends or `cancel` is raised.
pub fn run_blocking(
    engine: &mut TrackingEngine,
    source: &mut dyn LandmarkSource,
    cancel: &AtomicBool,
) -> Result<CalibrationOutcome, SourceError> {
    if !engine.start_calibration() {
        tracing::debug!("Continuing calibration already in progress");
    }

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Ok(engine.cancel_calibration().unwrap_or(CalibrationOutcome::Failed(
                CalibrationFailure::Cancelled { point: 0 },
            )));
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                return Ok(engine.calibration_source_ended().unwrap_or(
                    CalibrationOutcome::Failed(CalibrationFailure::SourceEnded { point: 0 }),
                ));
            }
            Err(err) => {
                engine.cancel_calibration();
                return Err(err);
            }
        };

        let output = engine.process(&frame.observation, frame.timestamp);
        if let Some(CalibrationStep::Finished(outcome)) = output.calibration {
            return Ok(outcome);
        }
    }
}
