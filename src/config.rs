use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use crate::tracking::config::GazeMode;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    pub realtime: RealtimeConfig,
    pub tracking: TrackingEnvConfig,
}

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub event_channel_capacity: usize,
    pub max_sse_connections: usize,
}

/// Startup overrides for the tracking defaults. Anything persisted through
/// `/api/settings` takes precedence over these.
#[derive(Debug, Clone)]
pub struct TrackingEnvConfig {
    pub ear_threshold: f64,
    pub gaze_mode: GazeMode,
    pub screen_width: u32,
    pub screen_height: u32,
    pub edge_scroll_enabled: bool,
}

impl Default for TrackingEnvConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.20,
            gaze_mode: GazeMode::Iris,
            screen_width: 1920,
            screen_height: 1080,
            edge_scroll_enabled: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = TrackingEnvConfig::default();
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/gaze-blink.sled"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            realtime: RealtimeConfig {
                event_channel_capacity: env_or_parse("EVENT_CHANNEL_CAPACITY", 256_usize).max(1),
                max_sse_connections: env_or_parse("MAX_SSE_CONNECTIONS", 8_usize),
            },
            tracking: TrackingEnvConfig {
                ear_threshold: env_or_parse("EAR_THRESHOLD", defaults.ear_threshold),
                gaze_mode: env_or_gaze_mode("GAZE_MODE", defaults.gaze_mode),
                screen_width: env_or_parse("SCREEN_WIDTH", defaults.screen_width),
                screen_height: env_or_parse("SCREEN_HEIGHT", defaults.screen_height),
                edge_scroll_enabled: env_or_bool("EDGE_SCROLL_ENABLED", defaults.edge_scroll_enabled),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn env_or_gaze_mode(key: &str, default: GazeMode) -> GazeMode {
    match env::var(key) {
        Ok(raw) => GazeMode::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(key, value = %raw, "Unknown gaze mode, using default");
            default
        }),
        Err(_) => default,
    }
}
