use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, Mutex};

use crate::actions::TrackingEvent;
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::store::Store;
use crate::tracking::TrackingConfig;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    pipeline: Arc<Mutex<Pipeline>>,
    events: broadcast::Sender<TrackingEvent>,
    sse_connections: Arc<AtomicUsize>,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    /// Builds the pipeline from persisted settings and calibration, falling
    /// back to environment defaults.
    pub fn new(store: Arc<Store>, config: &Config, shutdown_tx: broadcast::Sender<()>) -> Self {
        let tracking = match store.load_settings() {
            Ok(Some(saved)) => saved,
            Ok(None) => env_tracking_config(config),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read tracking settings, using defaults");
                env_tracking_config(config)
            }
        };

        let (events, _) = broadcast::channel(config.realtime.event_channel_capacity);
        let mut pipeline = Pipeline::new(tracking, events.clone());

        match store.load_calibration() {
            Ok(record) => {
                let bounds = record.and_then(|r| r.into_bounds());
                if bounds.is_some() {
                    tracing::info!(?bounds, "Restored calibration");
                }
                pipeline.engine_mut().set_bounds(bounds);
            }
            Err(e) => tracing::error!(error = %e, "Failed to read calibration record"),
        }

        Self {
            store,
            pipeline: Arc::new(Mutex::new(pipeline)),
            events,
            sse_connections: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config.clone()),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn pipeline(&self) -> &Mutex<Pipeline> {
        &self.pipeline
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TrackingEvent> {
        self.events.subscribe()
    }

    /// Reserves an SSE slot. Returns `None` when the limit is reached.
    pub fn try_acquire_sse(&self) -> Option<SseSlot> {
        let max = self.config.realtime.max_sse_connections;
        let current = self.sse_connections.fetch_add(1, Ordering::SeqCst);
        if current >= max {
            self.sse_connections.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(SseSlot {
            counter: self.sse_connections.clone(),
        })
    }

    pub fn sse_connections(&self) -> usize {
        self.sse_connections.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Monotonic seconds since startup, used for frames without a timestamp.
    pub fn clock_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

fn env_tracking_config(config: &Config) -> TrackingConfig {
    let tracking = TrackingConfig::from_env(&config.tracking);
    match tracking.validate() {
        Ok(()) => tracking,
        Err(reason) => {
            tracing::warn!(%reason, "Invalid tracking environment, using built-in defaults");
            TrackingConfig::default()
        }
    }
}

/// Releases its SSE slot on drop.
#[derive(Debug)]
pub struct SseSlot {
    counter: Arc<AtomicUsize>,
}

impl Drop for SseSlot {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use crate::config::Config;
    use crate::store::Store;
    use crate::tracking::{CalibrationBounds, CalibrationRecord};

    use super::*;

    fn config_with_sse(max: usize) -> Config {
        let mut cfg = Config::from_env();
        cfg.realtime.max_sse_connections = max;
        cfg
    }

    #[tokio::test]
    async fn sse_slots_are_bounded_and_released() {
        let cfg = config_with_sse(1);
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(Store::open(tmp.path().join("state_sse.sled").to_str().unwrap()).unwrap());
        let (tx, _) = broadcast::channel(4);
        let state = AppState::new(store, &cfg, tx);

        let slot = state.try_acquire_sse().expect("first slot");
        assert!(state.try_acquire_sse().is_none());
        drop(slot);
        assert_eq!(state.sse_connections(), 0);
        assert!(state.try_acquire_sse().is_some());
    }

    #[tokio::test]
    async fn restores_persisted_calibration() {
        let cfg = config_with_sse(1);
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(Store::open(tmp.path().join("state_cal.sled").to_str().unwrap()).unwrap());
        let bounds = CalibrationBounds {
            min_x: 0.3,
            max_x: 0.7,
            min_y: 0.3,
            max_y: 0.7,
        };
        store.save_calibration(&CalibrationRecord::from_bounds(bounds)).unwrap();

        let (tx, _) = broadcast::channel(4);
        let state = AppState::new(store, &cfg, tx);
        let pipeline = state.pipeline().lock().await;
        assert_eq!(pipeline.engine().bounds(), Some(bounds));
    }

    #[tokio::test]
    async fn invalid_env_tracking_falls_back_to_defaults() {
        let mut cfg = config_with_sse(1);
        cfg.tracking.ear_threshold = 3.0;
        cfg.tracking.screen_width = 0;
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(Store::open(tmp.path().join("state_env.sled").to_str().unwrap()).unwrap());
        let (tx, _) = broadcast::channel(4);
        let state = AppState::new(store, &cfg, tx);

        let pipeline = state.pipeline().lock().await;
        let live = pipeline.engine().config();
        assert!(live.validate().is_ok());
        assert_eq!(*live, TrackingConfig::default());
    }

    #[tokio::test]
    async fn shutdown_receiver_can_clone() {
        let cfg = config_with_sse(1);
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(
            Store::open(tmp.path().join("state_shutdown.sled").to_str().unwrap()).unwrap(),
        );
        let (tx, _) = broadcast::channel(4);
        let state = AppState::new(store, &cfg, tx.clone());

        let mut rx1 = state.shutdown_rx();
        let mut rx2 = state.shutdown_rx();
        tx.send(()).unwrap();
        rx1.recv().await.unwrap();
        rx2.recv().await.unwrap();
    }
}
