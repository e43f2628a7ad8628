use crate::store::keys;
use crate::store::{Store, StoreError};
use crate::tracking::CalibrationRecord;

impl Store {
    /// Stored record, or `None` when absent. A record that no longer parses
    /// is logged and treated as absent.
    pub fn load_calibration(&self) -> Result<Option<CalibrationRecord>, StoreError> {
        let Some(raw) = self.calibration.get(keys::CURRENT_CALIBRATION.as_bytes())? else {
            return Ok(None);
        };
        match Self::deserialize::<CalibrationRecord>(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(error) => {
                tracing::warn!(error = %error, "Discarding unreadable calibration record");
                Ok(None)
            }
        }
    }

    pub fn save_calibration(&self, record: &CalibrationRecord) -> Result<(), StoreError> {
        self.calibration
            .insert(keys::CURRENT_CALIBRATION.as_bytes(), Self::serialize(record)?)?;
        Ok(())
    }

    pub fn clear_calibration(&self) -> Result<(), StoreError> {
        self.calibration.remove(keys::CURRENT_CALIBRATION.as_bytes())?;
        Ok(())
    }
}
