/// Single-slot keys. Each tree holds the latest value under one key.
pub const CURRENT_CALIBRATION: &str = "current";
pub const TRACKING_SETTINGS: &str = "tracking";
/// Probe key read by the health endpoint.
pub const HEALTH_PROBE: &str = "__health_check__";
