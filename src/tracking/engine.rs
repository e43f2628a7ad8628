use super::blink::BlinkDetector;
use super::calibration::{
    CalibrationBounds, CalibrationOutcome, CalibrationProgress, CalibrationSession, CalibrationStep,
};
use super::config::{GazeMode, TrackingConfig};
use super::ear::binocular_ear;
use super::edge_scroll::{EdgeScrollDetector, ScrollDirection};
use super::gaze;
use super::landmarks::{FaceLayout, MediaPipeFaceMesh};
use super::mapper::CoordinateMapper;
use super::pattern::BlinkPatternClassifier;
use super::smoothing::GazeSmoother;
use super::types::{FaceObservation, FrameOutput, GazeSample, GestureKind};

pub struct TrackingEngine {
    config: TrackingConfig,
    layout: Box<dyn FaceLayout>,
    blink: BlinkDetector,
    pattern: BlinkPatternClassifier,
    smoother: GazeSmoother,
    mapper: CoordinateMapper,
    edge_scroll: EdgeScrollDetector,
    bounds: Option<CalibrationBounds>,
    calibration: Option<CalibrationSession>,
    last_timestamp: Option<f64>,
}

impl std::fmt::Debug for TrackingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingEngine")
            .field("config", &self.config)
            .field("bounds", &self.bounds)
            .field("calibrating", &self.calibration.is_some())
            .field("last_timestamp", &self.last_timestamp)
            .finish_non_exhaustive()
    }
}

impl TrackingEngine {
    pub fn new(config: TrackingConfig) -> Self {
        Self::with_layout(config, Box::new(MediaPipeFaceMesh))
    }

    pub fn with_layout(config: TrackingConfig, layout: Box<dyn FaceLayout>) -> Self {
        Self {
            blink: BlinkDetector::new(config.blink.clone()),
            pattern: BlinkPatternClassifier::new(config.pattern.clone()),
            smoother: GazeSmoother::new(config.gaze.history_size, config.gaze.smoothing_factor),
            mapper: CoordinateMapper::new(config.cursor.clone()),
            edge_scroll: EdgeScrollDetector::new(config.edge_scroll.clone(), config.cursor.screen_height),
            layout,
            config,
            bounds: None,
            calibration: None,
            last_timestamp: None,
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Validates and applies new parameters. On error the current config
    /// stays in place. Blink and gaze state carry over.
    pub fn reload_config(&mut self, config: TrackingConfig) -> Result<(), String> {
        config.validate()?;

        self.blink.set_config(config.blink.clone());
        self.pattern.set_config(config.pattern.clone());
        self.smoother
            .reconfigure(config.gaze.history_size, config.gaze.smoothing_factor);
        self.mapper.set_config(config.cursor.clone());
        self.edge_scroll
            .set_config(config.edge_scroll.clone(), config.cursor.screen_height);
        self.config = config;

        tracing::info!(
            ear_threshold = self.config.blink.ear_threshold,
            gaze_mode = ?self.config.gaze.mode,
            "Tracking config reloaded"
        );
        Ok(())
    }

    pub fn bounds(&self) -> Option<CalibrationBounds> {
        self.bounds
    }

    pub fn is_calibrated(&self) -> bool {
        self.bounds.is_some()
    }

    pub fn set_bounds(&mut self, bounds: Option<CalibrationBounds>) {
        self.bounds = bounds.filter(CalibrationBounds::is_valid);
        self.mapper.reset();
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibration.is_some()
    }

    pub fn start_calibration(&mut self) -> bool {
        if self.calibration.is_some() {
            return false;
        }
        self.calibration = Some(CalibrationSession::new(self.config.calibration.clone()));
        true
    }

    pub fn calibration_progress(&self) -> Option<CalibrationProgress> {
        let now = self.last_timestamp.unwrap_or(0.0);
        self.calibration.as_ref().map(|session| session.progress(now))
    }

    /// Discards the run in progress, leaving the previous bounds in place.
    pub fn cancel_calibration(&mut self) -> Option<CalibrationOutcome> {
        self.calibration.take().map(|session| session.cancel())
    }

    pub fn calibration_source_ended(&mut self) -> Option<CalibrationOutcome> {
        self.calibration.take().map(|session| session.source_ended())
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    pub fn reset(&mut self) {
        self.blink.reset();
        self.pattern.reset();
        self.smoother.reset();
        self.mapper.reset();
        self.edge_scroll.reset();
        self.calibration = None;
        self.last_timestamp = None;
    }

    fn clamp_timestamp(&mut self, now: f64) -> f64 {
        let now = match self.last_timestamp {
            Some(last) if !now.is_finite() || now < last => last,
            None if !now.is_finite() => 0.0,
            _ => now,
        };
        self.last_timestamp = Some(now);
        now
    }

    fn step_calibration(
        &mut self,
        sample: Option<GazeSample>,
        gesture: Option<GestureKind>,
        now: f64,
    ) -> Option<CalibrationStep> {
        let session = self.calibration.as_mut()?;
        let step = session.step(sample, gesture, now);
        if let CalibrationStep::Finished(outcome) = &step {
            if let Some(bounds) = outcome.bounds() {
                self.bounds = Some(bounds);
                self.mapper.reset();
            }
            self.calibration = None;
        }
        Some(step)
    }

    /// Runs one frame through the pipeline. `now` is in seconds and is
    /// clamped so it never moves backwards.
    pub fn process(&mut self, observation: &FaceObservation, now: f64) -> FrameOutput {
        let now = self.clamp_timestamp(now);
        let mut out = FrameOutput::empty(now);

        let layout = self.layout.as_ref();
        let read = observation
            .face()
            .and_then(|frame| layout.eyes(frame).map(|eyes| (frame, eyes)));

        let Some((frame, eyes)) = read else {
            // No face: nothing fires, pending blinks wait for the next face.
            out.blink_count = self.pattern.sequence_len();
            out.pending = self.pattern.pending();
            out.calibration = self.step_calibration(None, None, now);
            return out;
        };
        out.face_detected = true;

        let ear = binocular_ear(&eyes.left.ear_points, &eyes.right.ear_points);
        out.ear = Some(ear);
        if let Some(event) = self.blink.update(ear, now) {
            self.pattern.record_blink(event.timestamp);
            out.blink = Some(event);
        }

        let gesture = self.pattern.poll(now);
        out.gesture = gesture;
        out.blink_count = self.pattern.sequence_len();
        out.pending = self.pattern.pending();

        let raw = match self.config.gaze.mode {
            GazeMode::Iris => gaze::binocular_gaze(&eyes),
            mode => gaze::extract(layout, frame, mode).unwrap_or(GazeSample::CENTER),
        };
        let smoothed = self.smoother.update(raw);
        out.gaze = Some(smoothed);

        if self.calibration.is_some() {
            out.calibration = self.step_calibration(Some(smoothed), gesture, now);
            return out;
        }

        let bounds = self.bounds.unwrap_or_default();
        let cursor = self.mapper.map(smoothed, &bounds);
        out.cursor = Some(cursor);

        match gesture {
            Some(kind) => out.actions = kind.action(),
            None => match self.edge_scroll.update(cursor.y, now) {
                Some(ScrollDirection::Up) => out.actions.scroll_up = true,
                Some(ScrollDirection::Down) => out.actions.scroll_down = true,
                None => {}
            },
        }

        out
    }
}
