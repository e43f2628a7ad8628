//! Blink detection state machine.

use serde::Serialize;

use super::config::BlinkConfig;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkState {
    pub in_blink: bool,
    pub consecutive_closed_frames: u32,
    pub started_at: Option<f64>,
}

/// A validated blink, stamped with the reopening time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkEvent {
    pub timestamp: f64,
    pub closed_frames: u32,
    pub duration_secs: f64,
}

/// Pure transition: consumes the previous state and one averaged EAR value.
pub fn step(
    state: BlinkState,
    avg_ear: f64,
    now: f64,
    config: &BlinkConfig,
) -> (BlinkState, Option<BlinkEvent>) {
    if avg_ear < config.ear_threshold {
        let started_at = if state.in_blink {
            state.started_at
        } else {
            tracing::debug!(ear = avg_ear, t = now, "Eyes closing");
            Some(now)
        };
        let next = BlinkState {
            in_blink: true,
            consecutive_closed_frames: state.consecutive_closed_frames.saturating_add(1),
            started_at,
        };
        return (next, None);
    }

    let event = if state.in_blink && state.consecutive_closed_frames >= config.min_blink_frames {
        let duration_secs = state.started_at.map(|s| now - s).unwrap_or(0.0);
        tracing::debug!(
            frames = state.consecutive_closed_frames,
            duration_secs,
            "Blink completed"
        );
        Some(BlinkEvent {
            timestamp: now,
            closed_frames: state.consecutive_closed_frames,
            duration_secs,
        })
    } else {
        if state.in_blink {
            tracing::debug!(
                frames = state.consecutive_closed_frames,
                "Closed run too short, ignored"
            );
        }
        None
    };

    (BlinkState::default(), event)
}

#[derive(Debug, Clone)]
pub struct BlinkDetector {
    config: BlinkConfig,
    state: BlinkState,
}

impl BlinkDetector {
    pub fn new(config: BlinkConfig) -> Self {
        Self {
            config,
            state: BlinkState::default(),
        }
    }

    /// Feeds the both-eye average EAR of one frame.
    pub fn update(&mut self, avg_ear: f64, now: f64) -> Option<BlinkEvent> {
        let (next, event) = step(self.state, avg_ear, now, &self.config);
        self.state = next;
        event
    }

    pub fn state(&self) -> BlinkState {
        self.state
    }

    pub fn config(&self) -> &BlinkConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: BlinkConfig) {
        self.config = config;
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.config.ear_threshold = threshold;
        tracing::info!(threshold, "EAR threshold updated");
    }

    pub fn reset(&mut self) {
        self.state = BlinkState::default();
    }
}
