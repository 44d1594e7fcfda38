use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{ScanRequest, ScanStarted, ScanStatus, ScanStatusEnvelope};

impl ApiClient {
    /// Start a network scan.
    ///
    /// `POST /api/scan`. A scan already in progress is answered with
    /// HTTP 409 `scan_in_progress` (see [`Error::is_conflict`]).
    pub async fn start_scan(&self, request: &ScanRequest) -> Result<ScanStarted, Error> {
        debug!(?request, "starting scan");
        self.post("/api/scan", request).await
    }

    /// Current scan state.
    ///
    /// `GET /api/scan/status`
    pub async fn scan_status(&self) -> Result<ScanStatus, Error> {
        let envelope: ScanStatusEnvelope = self.get("/api/scan/status").await?;
        Ok(envelope.into_status())
    }
}
