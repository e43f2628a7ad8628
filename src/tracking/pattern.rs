//! Multi-blink pattern classification, longest pattern first.

use std::collections::VecDeque;

use serde::Serialize;

use super::config::PatternConfig;
use super::types::GestureKind;

/// Largest blink count with its own gesture. Reaching it commits at once.
pub const MAX_PATTERN_BLINKS: usize = 5;

/// Absorbs float error in frame timestamps such as `33.0 / 30.0`.
const SETTLE_EPSILON: f64 = 1e-9;

/// Classification of the current sequence, waiting for its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingGesture {
    pub kind: GestureKind,
    pub blink_count: usize,
    pub newest_blink: f64,
    /// Zero for the maximum count.
    pub settle_secs: f64,
}

impl PendingGesture {
    pub fn deadline(&self) -> f64 {
        self.newest_blink + self.settle_secs
    }

    /// True once the quiet time after the newest blink exceeds the settle delay.
    pub fn is_due(&self, now: f64) -> bool {
        if self.settle_secs <= 0.0 {
            true
        } else {
            now - self.newest_blink > self.settle_secs + SETTLE_EPSILON
        }
    }
}

/// Pure classification of a time-ordered blink sequence.
pub fn classify(sequence: &[f64], config: &PatternConfig) -> Option<PendingGesture> {
    let (&oldest, &newest) = (sequence.first()?, sequence.last()?);
    let count = sequence.len();
    let span = newest - oldest;
    let within_span = span <= config.sequence_timeout_secs;

    let pending = |kind: GestureKind, settle_secs: f64| PendingGesture {
        kind,
        blink_count: count,
        newest_blink: newest,
        settle_secs,
    };

    if count >= MAX_PATTERN_BLINKS {
        return within_span.then(|| pending(GestureKind::Quintuple, 0.0));
    }
    if count == 4 {
        return within_span.then(|| pending(GestureKind::Quadruple, config.settle_delay_secs));
    }
    if count == 3 {
        return within_span.then(|| pending(GestureKind::Triple, config.settle_delay_secs));
    }
    if count == 2 {
        let gap = newest - oldest;
        let valid_gap = (config.min_gap_secs..=config.max_gap_secs).contains(&gap);
        return valid_gap.then(|| pending(GestureKind::Double, config.settle_delay_secs));
    }
    None
}

#[derive(Debug, Clone)]
pub struct BlinkPatternClassifier {
    config: PatternConfig,
    sequence: VecDeque<f64>,
    last_action_time: Option<f64>,
}

impl BlinkPatternClassifier {
    pub fn new(config: PatternConfig) -> Self {
        Self {
            config,
            sequence: VecDeque::with_capacity(8),
            last_action_time: None,
        }
    }

    pub fn record_blink(&mut self, timestamp: f64) {
        self.sequence.push_back(timestamp);
        tracing::debug!(count = self.sequence.len(), t = timestamp, "Blink added to sequence");
    }

    /// Drops blinks that fell out of the sequence window.
    pub fn prune(&mut self, now: f64) {
        let timeout = self.config.sequence_timeout_secs;
        while let Some(&front) = self.sequence.front() {
            if now - front >= timeout {
                self.sequence.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn in_cooldown(&self, now: f64) -> bool {
        self.last_action_time
            .is_some_and(|last| now - last < self.config.cooldown_secs)
    }

    /// What the current sequence would fire as, ignoring cooldown.
    pub fn pending(&mut self) -> Option<PendingGesture> {
        classify(self.sequence.make_contiguous(), &self.config)
    }

    /// Per-frame check. Returns at most one gesture.
    pub fn poll(&mut self, now: f64) -> Option<GestureKind> {
        self.prune(now);

        if self.in_cooldown(now) {
            return None;
        }

        let pending = self.pending()?;
        if !pending.is_due(now) {
            return None;
        }

        self.sequence.clear();
        self.last_action_time = Some(now);
        tracing::info!(
            gesture = pending.kind.as_str(),
            blinks = pending.blink_count,
            "Blink gesture detected"
        );
        Some(pending.kind)
    }

    pub fn sequence_len(&self) -> usize {
        self.sequence.len()
    }

    pub fn last_action_time(&self) -> Option<f64> {
        self.last_action_time
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PatternConfig) {
        self.config = config;
    }

    pub fn reset(&mut self) {
        self.sequence.clear();
        self.last_action_time = None;
    }
}
