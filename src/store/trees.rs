pub const CALIBRATION: &str = "calibration";
pub const SETTINGS: &str = "settings";
