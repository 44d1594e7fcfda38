// Operational endpoints: health, retention, backup, reset
//
// Retention and reset are optional backend features; when missing the
// backend answers HTTP 501 (`Error::is_unsupported`).

use std::path::{Path, PathBuf};

use reqwest::Method;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::endpoints::download::{attachment_name, save_response};
use crate::error::Error;
use crate::models::{Health, ResetReport, RetentionReport};

/// File name used when the backup response does not announce one.
pub const DEFAULT_BACKUP_NAME: &str = "ids_web_backup.sqlite";

impl ApiClient {
    /// `GET /api/healthz`
    pub async fn health(&self) -> Result<Health, Error> {
        self.get("/api/healthz").await
    }

    /// Prune alerts and blocks older than the configured retention days.
    ///
    /// `POST /api/retention/run`
    pub async fn run_retention(&self) -> Result<RetentionReport, Error> {
        debug!("running retention");
        self.post("/api/retention/run", &json!({})).await
    }

    /// Download a copy of the backend database into `dir`.
    ///
    /// `GET /api/backup/db`
    pub async fn download_backup(&self, dir: &Path) -> Result<PathBuf, Error> {
        let resp = self
            .send::<Value>(Method::GET, "/api/backup/db", None, None)
            .await?;
        let name = attachment_name(&resp).unwrap_or_else(|| DEFAULT_BACKUP_NAME.to_owned());
        let path = save_response(resp, dir, &name).await?;
        info!(path = %path.display(), "backup downloaded");
        Ok(path)
    }

    /// Clear alerts, blocks, devices and trusted IPs on the backend.
    ///
    /// `POST /api/ops/reset`
    pub async fn reset_data(&self) -> Result<ResetReport, Error> {
        info!("resetting backend data");
        self.post("/api/ops/reset", &json!({})).await
    }
}
