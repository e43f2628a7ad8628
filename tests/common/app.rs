use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use gaze_blink_control::config::{Config, RealtimeConfig, TrackingEnvConfig};
use gaze_blink_control::routes::build_router;
use gaze_blink_control::state::AppState;
use gaze_blink_control::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub shutdown_tx: broadcast::Sender<()>,
    _temp_dir: TempDir,
}

/// Config is built directly; `set_var` would race between parallel tests.
pub fn test_config(sled_path: String, max_sse_connections: usize) -> Config {
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path,
        cors_origin: "http://localhost:5173".to_string(),
        realtime: RealtimeConfig {
            event_channel_capacity: 1024,
            max_sse_connections,
        },
        tracking: TrackingEnvConfig::default(),
    }
}

fn build(temp_dir: TempDir, config: Config) -> TestApp {
    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(store, &config, shutdown_tx.clone());
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        shutdown_tx,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_with_sse_limit(max_sse_connections: usize) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("gaze-test.sled");
    let config = test_config(sled_path.to_string_lossy().to_string(), max_sse_connections);
    build(temp_dir, config)
}

pub async fn spawn_test_server() -> TestApp {
    spawn_with_sse_limit(8).await
}
