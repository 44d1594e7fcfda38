use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::SettingsEnvelope;

impl ApiClient {
    /// Runtime settings keyed `Section.Key`.
    ///
    /// `GET /api/settings`
    pub async fn get_settings(&self) -> Result<BTreeMap<String, Value>, Error> {
        let envelope: SettingsEnvelope = self.get("/api/settings").await?;
        Ok(envelope.settings)
    }

    /// Update settings. Keys outside the backend's writable set are
    /// rejected with HTTP 400 and nothing is written.
    ///
    /// `PUT /api/settings`
    pub async fn put_settings(&self, updates: &BTreeMap<String, String>) -> Result<(), Error> {
        debug!(keys = ?updates.keys().collect::<Vec<_>>(), "updating settings");
        let _: Value = self.put("/api/settings", updates).await?;
        Ok(())
    }
}
