pub mod calibration;
pub mod settings;
