// Dashboard REST client
//
// Wraps `reqwest::Client` with base-URL joining, bearer/cookie credential
// selection and uniform response handling. Endpoint groups (alerts,
// blocks, scan, ...) are implemented as inherent methods in separate
// files to keep this module focused on transport mechanics.

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{AuthMode, TokenStore};
use crate::error::Error;
use crate::query::QueryParams;
use crate::transport::TransportConfig;

/// Async client for the dashboard backend's `/api` surface.
///
/// Cheaply cloneable; clones share the HTTP connection pool, cookie jar
/// and token store.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: TokenStore,
    transport: TransportConfig,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for the backend at `base_url`.
    ///
    /// `base_url` is the origin serving `/api/...` (a path prefix is kept,
    /// so a reverse-proxied `https://host/ids/` works too).
    pub fn new(base_url: &str, transport: TransportConfig, tokens: TokenStore) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            tokens,
            transport,
        })
    }

    /// Build with default transport settings and an in-memory token store.
    pub fn with_defaults(base_url: &str) -> Result<Self, Error> {
        Self::new(base_url, TransportConfig::default(), TokenStore::in_memory())
    }

    /// Ensure the base URL ends with `/` so relative joins keep its path.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    /// Which credential the next request will carry.
    pub fn auth_mode(&self) -> AuthMode {
        self.tokens.auth_mode()
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join an absolute API path (`/api/alerts`) onto the base URL.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// URL of the push channel, carrying `?token=` when a bearer token
    /// is held. Without one the session cookie authenticates.
    pub fn events_url(&self) -> Result<Url, Error> {
        let mut url = self.url("/api/events")?;
        if let Some(token) = self.tokens.current() {
            url.query_pairs_mut()
                .append_pair("token", token.expose_secret());
        }
        Ok(url)
    }

    // ── Generic request primitive ────────────────────────────────────

    /// Send an authenticated request and return the raw response.
    ///
    /// Attaches `Authorization: Bearer` when a non-expired token is held;
    /// the cookie jar is always consulted. On HTTP 401 the token is
    /// purged before the error is returned. Any non-2xx becomes an
    /// [`Error`] carrying the status and the parsed JSON body.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<&B>,
    ) -> Result<reqwest::Response, Error> {
        let url = self.url(path)?;
        self.send_url(method, url, query, body).await
    }

    /// [`send`](Self::send) against an already-built URL (for paths with
    /// percent-encoded segments).
    pub async fn send_url<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        query: Option<&QueryParams>,
        body: Option<&B>,
    ) -> Result<reqwest::Response, Error> {
        debug!("{method} {url}");

        let mut builder = self.http.request(method, url);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            builder = builder.query(query.pairs());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if let Some(token) = self.tokens.current() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| Error::InvalidHeader(format!("bearer token: {e}")))?;
            value.set_sensitive(true);
            builder = builder.header(AUTHORIZATION, value);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!("backend answered 401, purging bearer token");
            self.tokens.clear();
        }
        Err(Error::from_status(status, read_error_body(resp).await))
    }

    /// Send a request and decode the JSON response.
    pub async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<&B>,
    ) -> Result<T, Error> {
        let resp = self.send(method, path, query, body).await?;
        decode_json(resp).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request::<T, Value>(Method::GET, path, None, None).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &QueryParams,
    ) -> Result<T, Error> {
        self.request::<T, Value>(Method::GET, path, Some(query), None)
            .await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.request(Method::POST, path, None, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.request(Method::PUT, path, None, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request::<T, Value>(Method::DELETE, path, None, None)
            .await
    }
}

// ── Response handling ────────────────────────────────────────────────

pub(crate) async fn decode_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = resp.text().await?;
    // Empty 2xx bodies decode as `null` so `Value` / `()`-like targets work.
    let text = if body.trim().is_empty() { "null" } else { body.as_str() };
    serde_json::from_str(text).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

/// Parsed JSON error payload, or `{}` when the body is not JSON.
async fn read_error_body(resp: reqwest::Response) -> Value {
    let raw = resp.text().await.unwrap_or_default();
    serde_json::from_str(&raw).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_keeps_path_prefix() {
        let client = ApiClient::with_defaults("https://ids.example.net/proxy").expect("client");
        assert_eq!(
            client.url("/api/alerts").expect("url").as_str(),
            "https://ids.example.net/proxy/api/alerts"
        );
    }

    #[test]
    fn events_url_without_token_has_no_query() {
        let client = ApiClient::with_defaults("http://127.0.0.1:5000").expect("client");
        assert_eq!(
            client.events_url().expect("url").as_str(),
            "http://127.0.0.1:5000/api/events"
        );
    }

    #[test]
    fn events_url_carries_token() {
        let client = ApiClient::with_defaults("http://127.0.0.1:5000/").expect("client");
        let exp = chrono::Utc::now() + chrono::Duration::hours(1);
        client
            .tokens()
            .store(&secrecy::SecretString::from("t0k/en".to_string()), exp);
        assert_eq!(
            client.events_url().expect("url").as_str(),
            "http://127.0.0.1:5000/api/events?token=t0k%2Fen"
        );
        assert_eq!(client.auth_mode(), AuthMode::Bearer);
    }
}
