use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlinkConfig {
    /// Average EAR below this value counts as "eyes closed".
    pub ear_threshold: f64,
    /// Closed run shorter than this is treated as sensor noise.
    pub min_blink_frames: u32,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.20,
            min_blink_frames: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatternConfig {
    /// Blinks older than this are pruned from the sequence.
    pub sequence_timeout_secs: f64,
    /// Valid inter-blink gap for a double blink.
    pub min_gap_secs: f64,
    pub max_gap_secs: f64,
    /// Quiet time after the newest blink before a non-final count commits.
    pub settle_delay_secs: f64,
    /// No gesture fires within this window after the previous one.
    pub cooldown_secs: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            sequence_timeout_secs: 1.5,
            min_gap_secs: 0.1,
            max_gap_secs: 0.7,
            settle_delay_secs: 0.5,
            cooldown_secs: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GazeMode {
    /// Iris position inside the eye socket.
    #[default]
    Iris,
    /// Nose-tip position, i.e. head pointing.
    Nose,
}

impl GazeMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "iris" | "gaze" => Some(Self::Iris),
            "nose" | "head" => Some(Self::Nose),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GazeConfig {
    pub mode: GazeMode,
    /// Moving-average window length.
    pub history_size: usize,
    /// Weight of the previous output in the exponential stage.
    pub smoothing_factor: f64,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            mode: GazeMode::Iris,
            history_size: 5,
            smoothing_factor: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CursorConfig {
    /// Weight of the previous pixel position.
    pub smoothing_factor: f64,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.5,
            screen_width: 1920,
            screen_height: 1080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalibrationConfig {
    /// Corner targets sit this far in from the true screen corner.
    pub target_inset: f64,
    /// Samples needed before a confirming blink is honored.
    pub min_samples: usize,
    /// Only the newest samples are averaged.
    pub sample_window: usize,
    pub point_timeout_secs: f64,
    pub margin: f64,
    /// Axes narrower than this fall back to `fallback_min..fallback_max`.
    pub min_range: f64,
    pub fallback_min: f64,
    pub fallback_max: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            target_inset: 0.1,
            min_samples: 10,
            sample_window: 30,
            point_timeout_secs: 15.0,
            margin: 0.05,
            min_range: 0.1,
            fallback_min: 0.2,
            fallback_max: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdgeScrollConfig {
    pub enabled: bool,
    pub edge_threshold_px: u32,
    pub dwell_secs: f64,
    pub repeat_interval_secs: f64,
    pub scroll_amount: i32,
}

impl Default for EdgeScrollConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            edge_threshold_px: 50,
            dwell_secs: 0.8,
            repeat_interval_secs: 0.3,
            scroll_amount: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActionConfig {
    /// Minimum gap between two invocations of the same sink command.
    pub min_gap_secs: f64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self { min_gap_secs: 0.5 }
    }
}

/// Every runtime-tunable parameter of the tracking pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingConfig {
    #[serde(default)]
    pub blink: BlinkConfig,
    #[serde(default)]
    pub pattern: PatternConfig,
    #[serde(default)]
    pub gaze: GazeConfig,
    #[serde(default)]
    pub cursor: CursorConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub edge_scroll: EdgeScrollConfig,
    #[serde(default)]
    pub actions: ActionConfig,
}

impl TrackingConfig {
    pub fn from_env(env_config: &crate::config::TrackingEnvConfig) -> Self {
        let mut config = Self::default();
        config.blink.ear_threshold = env_config.ear_threshold;
        config.gaze.mode = env_config.gaze_mode;
        config.cursor.screen_width = env_config.screen_width;
        config.cursor.screen_height = env_config.screen_height;
        config.edge_scroll.enabled = env_config.edge_scroll_enabled;
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.blink.ear_threshold) {
            return Err("blink.ear_threshold must be in [0,1]".to_string());
        }
        if self.blink.min_blink_frames == 0 {
            return Err("blink.min_blink_frames must be > 0".to_string());
        }

        let p = &self.pattern;
        if p.sequence_timeout_secs <= 0.0 {
            return Err("pattern.sequence_timeout_secs must be > 0".to_string());
        }
        if p.min_gap_secs < 0.0 || p.max_gap_secs <= 0.0 {
            return Err("pattern gap bounds must be positive".to_string());
        }
        if p.min_gap_secs > p.max_gap_secs {
            return Err("pattern.min_gap_secs must be <= pattern.max_gap_secs".to_string());
        }
        if p.settle_delay_secs < 0.0 {
            return Err("pattern.settle_delay_secs must be >= 0".to_string());
        }
        if p.cooldown_secs < 0.0 {
            return Err("pattern.cooldown_secs must be >= 0".to_string());
        }
        // A double blink must survive pruning until its settle deadline.
        if p.settle_delay_secs + p.max_gap_secs >= p.sequence_timeout_secs {
            return Err(
                "pattern.settle_delay_secs + pattern.max_gap_secs must be < pattern.sequence_timeout_secs"
                    .to_string(),
            );
        }

        if self.gaze.history_size == 0 {
            return Err("gaze.history_size must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.gaze.smoothing_factor) {
            return Err("gaze.smoothing_factor must be in [0,1]".to_string());
        }

        if !(0.0..=1.0).contains(&self.cursor.smoothing_factor) {
            return Err("cursor.smoothing_factor must be in [0,1]".to_string());
        }
        if self.cursor.screen_width == 0 || self.cursor.screen_height == 0 {
            return Err("cursor screen dimensions must be > 0".to_string());
        }

        let c = &self.calibration;
        if !(0.0..0.5).contains(&c.target_inset) {
            return Err("calibration.target_inset must be in [0,0.5)".to_string());
        }
        if c.min_samples == 0 || c.sample_window == 0 {
            return Err("calibration sample counts must be > 0".to_string());
        }
        if c.point_timeout_secs <= 0.0 {
            return Err("calibration.point_timeout_secs must be > 0".to_string());
        }
        if !(0.0..=0.5).contains(&c.margin) {
            return Err("calibration.margin must be in [0,0.5]".to_string());
        }
        if !(0.0..=1.0).contains(&c.min_range) {
            return Err("calibration.min_range must be in [0,1]".to_string());
        }
        if !(0.0..=1.0).contains(&c.fallback_min)
            || !(0.0..=1.0).contains(&c.fallback_max)
            || c.fallback_min >= c.fallback_max
        {
            return Err("calibration fallback range must satisfy 0 <= min < max <= 1".to_string());
        }

        let e = &self.edge_scroll;
        if e.dwell_secs < 0.0 || e.repeat_interval_secs < 0.0 {
            return Err("edge_scroll durations must be >= 0".to_string());
        }
        if e.scroll_amount <= 0 {
            return Err("edge_scroll.scroll_amount must be > 0".to_string());
        }

        if self.actions.min_gap_secs < 0.0 {
            return Err("actions.min_gap_secs must be >= 0".to_string());
        }

        Ok(())
    }
}
