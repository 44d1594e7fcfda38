// Log query and export

use std::path::{Path, PathBuf};

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::client::ApiClient;
use crate::endpoints::download::save_response;
use crate::error::Error;
use crate::models::{ExportFormat, Listing, LogEvent};
use crate::query::{LogFilter, QueryParams};

impl ApiClient {
    /// Filtered log events, newest first.
    ///
    /// `GET /api/logs?ip=&severity=&type=&from=&to=&limit=`
    pub async fn query_logs(&self, filter: &LogFilter) -> Result<Vec<LogEvent>, Error> {
        debug!(?filter, "querying logs");
        let listing: Listing<LogEvent> = self.get_with_query("/api/logs", &filter.to_query()).await?;
        Ok(listing.into_items())
    }

    /// Download a filtered export and save it as `ids_logs.<format>` in `dir`.
    ///
    /// `GET /api/logs/export?format=<fmt>&<filters>`
    pub async fn export_logs(
        &self,
        filter: &LogFilter,
        format: ExportFormat,
        dir: &Path,
    ) -> Result<PathBuf, Error> {
        let mut query = QueryParams::new().with("format", Some(format));
        for (key, value) in filter.to_query().pairs() {
            query.push(key, Some(value));
        }
        debug!(%format, dir = %dir.display(), "exporting logs");

        let resp = self
            .send::<Value>(Method::GET, "/api/logs/export", Some(&query), None)
            .await?;
        save_response(resp, dir, &format.file_name()).await
    }
}
