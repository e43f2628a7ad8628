use crate::store::keys;
use crate::store::{Store, StoreError};
use crate::tracking::TrackingConfig;

impl Store {
    /// Persisted tuning, or `None` if nothing usable is stored. Blobs that
    /// fail to parse or validate are logged and ignored so the caller falls
    /// back to defaults.
    pub fn load_settings(&self) -> Result<Option<TrackingConfig>, StoreError> {
        let Some(raw) = self.settings.get(keys::TRACKING_SETTINGS.as_bytes())? else {
            return Ok(None);
        };
        let config = match Self::deserialize::<TrackingConfig>(&raw) {
            Ok(config) => config,
            Err(error) => {
                tracing::warn!(error = %error, "Failed to deserialize tracking settings, using defaults");
                return Ok(None);
            }
        };
        if let Err(reason) = config.validate() {
            tracing::warn!(reason = %reason, "Persisted tracking settings are invalid, using defaults");
            return Ok(None);
        }
        Ok(Some(config))
    }

    pub fn save_settings(&self, config: &TrackingConfig) -> Result<(), StoreError> {
        config.validate().map_err(StoreError::Validation)?;
        self.settings
            .insert(keys::TRACKING_SETTINGS.as_bytes(), Self::serialize(config)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::store::keys;
    use crate::store::{Store, StoreError};
    use crate::tracking::TrackingConfig;

    fn open() -> (tempfile::TempDir, Store) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = Store::open(tmp.path().join("settings.sled").to_str().unwrap()).expect("open");
        (tmp, store)
    }

    #[test]
    fn settings_persist() {
        let (_tmp, store) = open();
        let mut cfg = TrackingConfig::default();
        cfg.blink.ear_threshold = 0.24;
        store.save_settings(&cfg).unwrap();
        assert_eq!(store.load_settings().unwrap(), Some(cfg));
    }

    #[test]
    fn invalid_settings_are_not_saved() {
        let (_tmp, store) = open();
        let mut cfg = TrackingConfig::default();
        cfg.gaze.history_size = 0;
        assert!(matches!(store.save_settings(&cfg), Err(StoreError::Validation(_))));
        assert!(store.load_settings().unwrap().is_none());
    }

    #[test]
    fn invalid_stored_blob_falls_back() {
        let (_tmp, store) = open();
        store
            .settings
            .insert(
                keys::TRACKING_SETTINGS.as_bytes(),
                br#"{"cursor":{"screenWidth":0}}"#.to_vec(),
            )
            .unwrap();
        assert!(store.load_settings().unwrap().is_none());
    }
}
