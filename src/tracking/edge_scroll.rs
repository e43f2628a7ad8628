//! Dwell-at-edge scrolling. Holding the cursor near the top or bottom screen
//! edge scrolls in that direction after a dwell, then repeats at an interval.

use serde::{Deserialize, Serialize};

use super::config::EdgeScrollConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct EdgeScrollDetector {
    config: EdgeScrollConfig,
    screen_height: u32,
    edge: Option<ScrollDirection>,
    dwell_started: Option<f64>,
    last_scroll: Option<f64>,
}

impl EdgeScrollDetector {
    pub fn new(config: EdgeScrollConfig, screen_height: u32) -> Self {
        Self {
            config,
            screen_height,
            edge: None,
            dwell_started: None,
            last_scroll: None,
        }
    }

    fn edge_at(&self, y: i32) -> Option<ScrollDirection> {
        let threshold = i64::from(self.config.edge_threshold_px);
        let y = i64::from(y);
        if y <= threshold {
            Some(ScrollDirection::Up)
        } else if y >= i64::from(self.screen_height) - threshold {
            Some(ScrollDirection::Down)
        } else {
            None
        }
    }

    /// Feeds the cursor's pixel row. Returns a direction when a scroll is due.
    pub fn update(&mut self, y: i32, now: f64) -> Option<ScrollDirection> {
        if !self.config.enabled {
            return None;
        }

        let edge = self.edge_at(y);
        if edge != self.edge {
            self.edge = edge;
            self.dwell_started = edge.map(|_| now);
            return None;
        }

        let direction = edge?;
        let started = self.dwell_started?;
        if now - started < self.config.dwell_secs {
            return None;
        }
        if self
            .last_scroll
            .is_some_and(|last| now - last < self.config.repeat_interval_secs)
        {
            return None;
        }

        self.last_scroll = Some(now);
        tracing::debug!(?direction, "Edge scroll");
        Some(direction)
    }

    pub fn scroll_amount(&self) -> i32 {
        self.config.scroll_amount
    }

    pub fn set_config(&mut self, config: EdgeScrollConfig, screen_height: u32) {
        self.config = config;
        self.screen_height = screen_height;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.edge = None;
        self.dwell_started = None;
    }
}
