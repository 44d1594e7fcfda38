// Block journal endpoints
//
// Blocking an IP on the trusted list is refused by the backend with
// HTTP 400 `{"ok": false, "error": "trusted_ip"}`; that payload surfaces
// unchanged as `Error::Validation`.

use serde_json::json;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{BlockEntry, BlockOutcome, BlockRequest, Listing};
use crate::query::QueryParams;

impl ApiClient {
    /// List the block/unblock journal, newest first.
    ///
    /// `GET /api/blocks?limit=`
    pub async fn list_blocks(&self, limit: Option<u32>) -> Result<Vec<BlockEntry>, Error> {
        debug!(?limit, "listing blocks");
        let query = QueryParams::new().with("limit", limit);
        let listing: Listing<BlockEntry> = self.get_with_query("/api/blocks", &query).await?;
        Ok(listing.into_items())
    }

    /// Block an IP, optionally for a limited time.
    ///
    /// `POST /api/blocks`
    pub async fn create_block(&self, request: &BlockRequest) -> Result<BlockOutcome, Error> {
        debug!(ip = %request.ip, duration = ?request.duration_minutes, "creating block");
        self.post("/api/blocks", request).await
    }

    /// Legacy single-IP block.
    ///
    /// `POST /api/block`
    pub async fn block_ip(&self, ip: &str, reason: Option<&str>) -> Result<BlockOutcome, Error> {
        debug!(ip, "blocking ip (legacy endpoint)");
        self.post("/api/block", &json!({ "ip": ip, "reason": reason.unwrap_or_default() }))
            .await
    }

    /// Lift a block.
    ///
    /// `POST /api/unblock`
    pub async fn unblock_ip(&self, ip: &str, reason: Option<&str>) -> Result<BlockOutcome, Error> {
        debug!(ip, "unblocking ip");
        self.post("/api/unblock", &json!({ "ip": ip, "reason": reason.unwrap_or_default() }))
            .await
    }
}
