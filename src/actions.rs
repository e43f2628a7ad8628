//! Per-frame action flags to debounced cursor commands.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::tracking::calibration::CalibrationStep;
use crate::tracking::config::TrackingConfig;
use crate::tracking::edge_scroll::ScrollDirection;
use crate::tracking::{FrameOutput, GestureKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ActionCommand {
    MoveTo { x: i32, y: i32 },
    LeftClick,
    RightClick,
    MiddleClick,
    Scroll { direction: ScrollDirection, amount: i32 },
    DragStart,
    DragEnd,
}

impl ActionCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MoveTo { .. } => "moveTo",
            Self::LeftClick => "leftClick",
            Self::RightClick => "rightClick",
            Self::MiddleClick => "middleClick",
            Self::Scroll { .. } => "scroll",
            Self::DragStart => "dragStart",
            Self::DragEnd => "dragEnd",
        }
    }

    fn is_debounced(&self) -> bool {
        !matches!(self, Self::MoveTo { .. })
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("no subscribers connected")]
    NoSubscribers,
    #[error("sink rejected {command}: {message}")]
    Rejected { command: &'static str, message: String },
}

pub trait ActionSink {
    fn execute(&mut self, command: &ActionCommand) -> Result<(), SinkError>;
}

/// Event pushed to realtime subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TrackingEvent {
    Cursor { x: i32, y: i32 },
    Action { command: ActionCommand },
    #[serde(rename_all = "camelCase")]
    Gesture { kind: GestureKind, blink_count: usize, timestamp: f64 },
    Calibration { step: CalibrationStep },
}

impl TrackingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cursor { .. } => "cursor",
            Self::Action { .. } => "action",
            Self::Gesture { .. } => "gesture",
            Self::Calibration { .. } => "calibration",
        }
    }
}

/// Publishes commands to SSE clients that own the real cursor.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<TrackingEvent>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<TrackingEvent>) -> Self {
        Self { tx }
    }
}

impl ActionSink for BroadcastSink {
    fn execute(&mut self, command: &ActionCommand) -> Result<(), SinkError> {
        let event = match *command {
            ActionCommand::MoveTo { x, y } => TrackingEvent::Cursor { x, y },
            other => TrackingEvent::Action { command: other },
        };
        self.tx
            .send(event)
            .map(|_| ())
            .map_err(|_| SinkError::NoSubscribers)
    }
}

/// Writes every command to the log. Used by the replay tool.
#[derive(Debug, Default)]
pub struct LogSink {
    executed: usize,
}

impl LogSink {
    pub fn executed(&self) -> usize {
        self.executed
    }
}

impl ActionSink for LogSink {
    fn execute(&mut self, command: &ActionCommand) -> Result<(), SinkError> {
        self.executed += 1;
        match command {
            ActionCommand::MoveTo { x, y } => tracing::debug!(x, y, "move"),
            other => tracing::info!(command = ?other, "action"),
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct ActionDispatcher<S> {
    sink: S,
    min_gap_secs: f64,
    scroll_amount: i32,
    last_sent: HashMap<&'static str, f64>,
    dragging: bool,
}

impl<S: ActionSink> ActionDispatcher<S> {
    pub fn new(sink: S, config: &TrackingConfig) -> Self {
        Self {
            sink,
            min_gap_secs: config.actions.min_gap_secs,
            scroll_amount: config.edge_scroll.scroll_amount,
            last_sent: HashMap::new(),
            dragging: false,
        }
    }

    pub fn set_config(&mut self, config: &TrackingConfig) {
        self.min_gap_secs = config.actions.min_gap_secs;
        self.scroll_amount = config.edge_scroll.scroll_amount;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Sends the cursor move and any raised action of one frame. Returns the
    /// commands that reached the sink after debouncing.
    pub fn dispatch(&mut self, output: &FrameOutput) -> Vec<ActionCommand> {
        let now = output.timestamp;
        let mut sent = Vec::new();

        if let Some(cursor) = output.cursor {
            let command = ActionCommand::MoveTo {
                x: cursor.x,
                y: cursor.y,
            };
            if self.send(command, now) {
                sent.push(command);
            }
        }

        if let Some(command) = self.command_for(output) {
            if self.send(command, now) {
                match command {
                    ActionCommand::DragStart => self.dragging = true,
                    ActionCommand::DragEnd => self.dragging = false,
                    _ => {}
                }
                sent.push(command);
            }
        }

        sent
    }

    fn command_for(&self, output: &FrameOutput) -> Option<ActionCommand> {
        let a = &output.actions;
        if a.left_click {
            Some(ActionCommand::LeftClick)
        } else if a.right_click {
            Some(ActionCommand::RightClick)
        } else if a.middle_click {
            Some(ActionCommand::MiddleClick)
        } else if a.drag_toggle {
            Some(if self.dragging {
                ActionCommand::DragEnd
            } else {
                ActionCommand::DragStart
            })
        } else if a.scroll_up || a.scroll_down {
            let direction = if a.scroll_up {
                ScrollDirection::Up
            } else {
                ScrollDirection::Down
            };
            Some(ActionCommand::Scroll {
                direction,
                amount: self.scroll_amount,
            })
        } else {
            None
        }
    }

    fn send(&mut self, command: ActionCommand, now: f64) -> bool {
        let kind = command.kind();
        if command.is_debounced() {
            if let Some(last) = self.last_sent.get(kind) {
                if now - last < self.min_gap_secs {
                    tracing::debug!(command = kind, "Debounced");
                    return false;
                }
            }
        }

        let sent = match self.sink.execute(&command) {
            Ok(()) => true,
            Err(SinkError::NoSubscribers) => {
                // Nobody listening is normal for a headless server.
                tracing::trace!(command = kind, "No sink subscribers");
                true
            }
            Err(e) => {
                tracing::warn!(command = kind, error = %e, "Action sink failed");
                false
            }
        };
        if sent && command.is_debounced() {
            self.last_sent.insert(kind, now);
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::types::{CursorTarget, FrameActions};

    #[derive(Default)]
    struct Recording {
        commands: Vec<ActionCommand>,
        fail: bool,
    }

    impl ActionSink for Recording {
        fn execute(&mut self, command: &ActionCommand) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::Rejected {
                    command: command.kind(),
                    message: "driver offline".to_string(),
                });
            }
            self.commands.push(*command);
            Ok(())
        }
    }

    fn frame(t: f64, actions: FrameActions) -> FrameOutput {
        let mut out = FrameOutput::empty(t);
        out.face_detected = true;
        out.cursor = Some(CursorTarget {
            x: 100,
            y: 200,
            normalized_x: 0.05,
            normalized_y: 0.18,
        });
        out.actions = actions;
        out
    }

    fn flag(f: impl FnOnce(&mut FrameActions)) -> FrameActions {
        let mut a = FrameActions::default();
        f(&mut a);
        a
    }

    fn dispatcher() -> ActionDispatcher<Recording> {
        ActionDispatcher::new(Recording::default(), &TrackingConfig::default())
    }

    #[test]
    fn move_is_sent_every_frame() {
        let mut d = dispatcher();
        for i in 0..5 {
            d.dispatch(&frame(i as f64 * 0.01, FrameActions::default()));
        }
        assert_eq!(d.sink().commands.len(), 5);
        assert!(d
            .sink()
            .commands
            .iter()
            .all(|c| *c == ActionCommand::MoveTo { x: 100, y: 200 }));
    }

    #[test]
    fn same_click_within_gap_is_dropped() {
        let mut d = dispatcher();
        let click = flag(|a| a.left_click = true);
        assert!(d.dispatch(&frame(0.0, click)).contains(&ActionCommand::LeftClick));
        assert!(!d.dispatch(&frame(0.3, click)).contains(&ActionCommand::LeftClick));
        assert!(d.dispatch(&frame(0.6, click)).contains(&ActionCommand::LeftClick));
    }

    #[test]
    fn different_commands_debounce_independently() {
        let mut d = dispatcher();
        d.dispatch(&frame(0.0, flag(|a| a.left_click = true)));
        let sent = d.dispatch(&frame(0.1, flag(|a| a.right_click = true)));
        assert!(sent.contains(&ActionCommand::RightClick));
    }

    #[test]
    fn drag_toggle_alternates() {
        let mut d = dispatcher();
        let toggle = flag(|a| a.drag_toggle = true);
        assert!(d.dispatch(&frame(0.0, toggle)).contains(&ActionCommand::DragStart));
        assert!(d.is_dragging());
        assert!(d.dispatch(&frame(1.0, toggle)).contains(&ActionCommand::DragEnd));
        assert!(!d.is_dragging());
    }

    #[test]
    fn scroll_uses_configured_amount() {
        let mut d = dispatcher();
        let sent = d.dispatch(&frame(0.0, flag(|a| a.scroll_down = true)));
        assert!(sent.contains(&ActionCommand::Scroll {
            direction: ScrollDirection::Down,
            amount: 3
        }));
    }

    #[test]
    fn sink_failure_is_swallowed() {
        let mut d = ActionDispatcher::new(
            Recording {
                fail: true,
                ..Recording::default()
            },
            &TrackingConfig::default(),
        );
        let sent = d.dispatch(&frame(0.0, flag(|a| a.drag_toggle = true)));
        assert!(sent.is_empty());
        assert!(!d.is_dragging());
    }

    #[test]
    fn failed_click_can_be_retried_inside_gap() {
        let mut d = ActionDispatcher::new(
            Recording {
                fail: true,
                ..Recording::default()
            },
            &TrackingConfig::default(),
        );
        let click = flag(|a| a.left_click = true);
        assert!(d.dispatch(&frame(0.0, click)).is_empty());

        d.sink.fail = false;
        assert!(d.dispatch(&frame(0.1, click)).contains(&ActionCommand::LeftClick));
        assert!(!d.dispatch(&frame(0.2, click)).contains(&ActionCommand::LeftClick));
    }

    #[test]
    fn broadcast_sink_maps_move_to_cursor_event() {
        let (tx, mut rx) = broadcast::channel(8);
        let mut sink = BroadcastSink::new(tx);
        sink.execute(&ActionCommand::MoveTo { x: 3, y: 4 }).unwrap();
        sink.execute(&ActionCommand::RightClick).unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.name(), "cursor");
        let second = serde_json::to_value(rx.try_recv().unwrap()).unwrap();
        assert_eq!(second["type"], "action");
        assert_eq!(second["command"]["command"], "rightClick");
    }

    #[test]
    fn broadcast_without_subscribers_still_counts_as_sent() {
        let (tx, rx) = broadcast::channel(8);
        drop(rx);
        let mut d = ActionDispatcher::new(BroadcastSink::new(tx), &TrackingConfig::default());
        let sent = d.dispatch(&frame(0.0, flag(|a| a.middle_click = true)));
        assert_eq!(sent.len(), 2);
    }
}
