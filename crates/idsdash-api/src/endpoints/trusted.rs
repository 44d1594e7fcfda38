use reqwest::Method;
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{ApiClient, decode_json};
use crate::error::Error;
use crate::models::{Listing, TrustedIp};

impl ApiClient {
    /// `GET /api/trusted`
    pub async fn list_trusted(&self) -> Result<Vec<TrustedIp>, Error> {
        let listing: Listing<TrustedIp> = self.get("/api/trusted").await?;
        Ok(listing.into_items())
    }

    /// Add an IP to the allowlist.
    ///
    /// `POST /api/trusted`. Fails with HTTP 409 `ip_blocked` while the IP
    /// is blocked and HTTP 400 `bad_ip` for a malformed address.
    pub async fn add_trusted(&self, ip: &str, note: Option<&str>) -> Result<(), Error> {
        debug!(ip, "adding trusted ip");
        let _: Value = self
            .post("/api/trusted", &json!({ "ip": ip, "note": note.unwrap_or_default() }))
            .await?;
        Ok(())
    }

    /// `DELETE /api/trusted/{ip}` (the IP is percent-encoded as one segment).
    pub async fn remove_trusted(&self, ip: &str) -> Result<(), Error> {
        debug!(ip, "removing trusted ip");
        let mut url = self.url("/api/trusted/")?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(ip);
        let resp = self
            .send_url::<Value>(Method::DELETE, url, None, None)
            .await?;
        let _: Value = decode_json(resp).await?;
        Ok(())
    }
}
