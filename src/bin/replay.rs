//! Offline replay of recorded landmark frames.
//!
//! Usage:
//!   replay frames.jsonl                                   # track and log actions
//!   replay frames.jsonl --calibrate --save-calibration cal.json
//!   replay frames.jsonl --calibration cal.json --screen 2560x1440

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use gaze_blink_control::actions::{ActionDispatcher, LogSink};
use gaze_blink_control::config::Config;
use gaze_blink_control::logging::{init_tracing, LogConfig};
use gaze_blink_control::tracking::calibration::{
    run_blocking, LandmarkSource, SourceError, TimedObservation,
};
use gaze_blink_control::tracking::{
    CalibrationOutcome, CalibrationRecord, FrameRecord, TrackingConfig, TrackingEngine,
};
use thiserror::Error;

/// Spacing assumed for frames recorded without a timestamp.
const DEFAULT_FRAME_SECS: f64 = 1.0 / 30.0;

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(author, version, about = "Replay recorded face-mesh frames through the tracking pipeline", long_about = None)]
struct Args {
    /// JSON-lines file, one `{"timestampMs":..,"face":..}` record per line
    #[arg(required = true)]
    frames: PathBuf,

    /// Load calibration bounds from this record before tracking
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Run the five-point calibration on the first frames of the file
    #[arg(long)]
    calibrate: bool,

    /// Write the resulting calibration record here
    #[arg(long)]
    save_calibration: Option<PathBuf>,

    /// Screen size as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_screen)]
    screen: Option<(u32, u32)>,
}

#[derive(Debug, Error)]
enum ReplayError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("calibration record {path}: {source}")]
    Record {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid tracking config: {0}")]
    Config(String),
    #[error("calibration failed: {0}")]
    Calibration(String),
    #[error("replay task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn parse_screen(raw: &str) -> Result<(u32, u32), String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{raw}'"))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("bad width '{w}'"))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("bad height '{h}'"))?;
    if w == 0 || h == 0 {
        return Err("screen dimensions must be > 0".to_string());
    }
    Ok((w, h))
}

/// Reads `FrameRecord`s line by line. Blank lines are skipped.
struct JsonlSource {
    lines: Lines<BufReader<File>>,
    line: usize,
    last_timestamp: Option<f64>,
}

impl JsonlSource {
    fn open(path: &Path) -> Result<Self, ReplayError> {
        let file = File::open(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line: 0,
            last_timestamp: None,
        })
    }
}

impl LandmarkSource for JsonlSource {
    fn next_frame(&mut self) -> Result<Option<TimedObservation>, SourceError> {
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            let line = line?;
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }

            let record: FrameRecord =
                serde_json::from_str(&line).map_err(|e| SourceError::Malformed {
                    line: self.line,
                    message: e.to_string(),
                })?;
            let timestamp = record.timestamp_secs().unwrap_or_else(|| {
                self.last_timestamp.map_or(0.0, |t| t + DEFAULT_FRAME_SECS)
            });
            self.last_timestamp = Some(timestamp);

            return Ok(Some(TimedObservation {
                timestamp,
                observation: record.into_observation(),
            }));
        }
    }
}

#[derive(Debug, Default)]
struct Summary {
    frames: usize,
    face_frames: usize,
    blinks: usize,
    gestures: usize,
    commands: usize,
}

fn read_record(path: &Path) -> Result<CalibrationRecord, ReplayError> {
    let raw = std::fs::read(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| ReplayError::Record {
        path: path.to_path_buf(),
        source,
    })
}

fn write_record(path: &Path, record: &CalibrationRecord) -> Result<(), ReplayError> {
    let json = serde_json::to_vec_pretty(record).map_err(|source| ReplayError::Record {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn replay(args: Args, cancel: Arc<AtomicBool>) -> Result<Summary, ReplayError> {
    let env = Config::from_env();
    let mut config = TrackingConfig::from_env(&env.tracking);
    if let Some((w, h)) = args.screen {
        config.cursor.screen_width = w;
        config.cursor.screen_height = h;
    }
    config.validate().map_err(ReplayError::Config)?;

    let mut engine = TrackingEngine::new(config.clone());
    if let Some(path) = &args.calibration {
        let bounds = read_record(path)?.into_bounds();
        if bounds.is_none() {
            tracing::warn!(path = %path.display(), "Calibration record unusable, tracking uncalibrated");
        }
        engine.set_bounds(bounds);
    }

    let mut source = JsonlSource::open(&args.frames)?;

    if args.calibrate {
        tracing::info!("Calibrating from recorded frames");
        match run_blocking(&mut engine, &mut source, &cancel)? {
            CalibrationOutcome::Completed(bounds) => {
                tracing::info!(?bounds, "Calibration complete");
                if let Some(path) = &args.save_calibration {
                    write_record(path, &CalibrationRecord::from_bounds(bounds))?;
                    tracing::info!(path = %path.display(), "Calibration record written");
                }
            }
            CalibrationOutcome::Failed(reason) => {
                return Err(ReplayError::Calibration(reason.to_string()));
            }
        }
    }

    let mut dispatcher = ActionDispatcher::new(LogSink::default(), &config);
    let mut summary = Summary::default();
    while let Some(frame) = source.next_frame()? {
        if cancel.load(Ordering::Relaxed) {
            tracing::info!("Replay interrupted");
            break;
        }
        let output = engine.process(&frame.observation, frame.timestamp);
        summary.frames += 1;
        summary.face_frames += usize::from(output.face_detected);
        summary.blinks += usize::from(output.blink.is_some());
        if let Some(kind) = output.gesture {
            summary.gestures += 1;
            tracing::info!(gesture = kind.as_str(), timestamp = output.timestamp, "Gesture");
        }
        dispatcher.dispatch(&output);
    }
    summary.commands = dispatcher.sink().executed();
    Ok(summary)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&LogConfig::from(&Config::from_env()));

    let cancel = Arc::new(AtomicBool::new(false));
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.store(true, Ordering::Relaxed);
        }
    });

    let result = tokio::task::spawn_blocking(move || replay(args, cancel))
        .await
        .map_err(ReplayError::from)
        .and_then(|r| r);

    match result {
        Ok(summary) => {
            tracing::info!(
                frames = summary.frames,
                face_frames = summary.face_frames,
                blinks = summary.blinks,
                gestures = summary.gestures,
                commands = summary.commands,
                "Replay finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Replay failed");
            ExitCode::FAILURE
        }
    }
}
