use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::AlertPage;
use crate::query::QueryParams;

impl ApiClient {
    /// List alerts, newest first.
    ///
    /// `GET /api/alerts?limit=&cursor=`
    pub async fn list_alerts(&self, limit: Option<u32>, cursor: Option<&str>) -> Result<AlertPage, Error> {
        debug!(?limit, ?cursor, "listing alerts");
        let query = QueryParams::new()
            .with("limit", limit)
            .with("cursor", cursor);
        self.get_with_query("/api/alerts", &query).await
    }
}
