//! Server-side frame loop: engine, dispatcher and event fan-out behind one
//! lock so frames are processed strictly one at a time.

use tokio::sync::broadcast;

use crate::actions::{ActionDispatcher, BroadcastSink, TrackingEvent};
use crate::tracking::calibration::CalibrationStep;
use crate::tracking::{CalibrationBounds, FaceObservation, FrameOutput, TrackingConfig, TrackingEngine};

#[derive(Debug)]
pub struct Pipeline {
    engine: TrackingEngine,
    dispatcher: ActionDispatcher<BroadcastSink>,
    events: broadcast::Sender<TrackingEvent>,
}

impl Pipeline {
    pub fn new(config: TrackingConfig, events: broadcast::Sender<TrackingEvent>) -> Self {
        let dispatcher = ActionDispatcher::new(BroadcastSink::new(events.clone()), &config);
        Self {
            engine: TrackingEngine::new(config),
            dispatcher,
            events,
        }
    }

    pub fn engine(&self) -> &TrackingEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TrackingEngine {
        &mut self.engine
    }

    pub fn reload_config(&mut self, config: TrackingConfig) -> Result<(), String> {
        self.engine.reload_config(config)?;
        self.dispatcher.set_config(self.engine.config());
        Ok(())
    }

    /// Runs one frame, dispatches its commands and publishes gesture and
    /// calibration events.
    pub fn process(&mut self, observation: &FaceObservation, now: f64) -> FrameOutput {
        let output = self.engine.process(observation, now);
        self.dispatcher.dispatch(&output);

        if let Some(kind) = output.gesture {
            tracing::info!(gesture = kind.as_str(), timestamp = output.timestamp, "Gesture");
            self.publish(TrackingEvent::Gesture {
                kind,
                blink_count: kind.blink_count(),
                timestamp: output.timestamp,
            });
        }
        if let Some(step) = &output.calibration {
            if !matches!(step, CalibrationStep::Collecting(_)) {
                self.publish(TrackingEvent::Calibration { step: step.clone() });
            }
        }
        output
    }

    /// Bounds of a run that finished successfully in `output`.
    pub fn completed_bounds(output: &FrameOutput) -> Option<CalibrationBounds> {
        match &output.calibration {
            Some(CalibrationStep::Finished(outcome)) => outcome.bounds(),
            _ => None,
        }
    }

    pub fn publish(&self, event: TrackingEvent) {
        // Err only means no subscriber is connected.
        let _ = self.events.send(event);
    }
}
