use serde_json::{Value, json};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{Device, Listing};

impl ApiClient {
    /// Device inventory discovered by scans.
    ///
    /// `GET /api/devices`
    pub async fn list_devices(&self) -> Result<Vec<Device>, Error> {
        let listing: Listing<Device> = self.get("/api/devices").await?;
        Ok(listing.into_items())
    }

    /// Set a device's nickname. An empty name only refreshes `last_seen`.
    ///
    /// `PUT /api/device`
    pub async fn rename_device(&self, ip: &str, name: &str) -> Result<(), Error> {
        debug!(ip, name, "renaming device");
        let _: Value = self
            .put("/api/device", &json!({ "ip": ip, "name": name }))
            .await?;
        Ok(())
    }
}
