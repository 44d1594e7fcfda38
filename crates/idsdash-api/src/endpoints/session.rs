// Session endpoints: login, logout, identity probe.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::auth::resolve_expiry;
use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{Identity, LoginResponse};

impl ApiClient {
    /// Authenticate with username and password.
    ///
    /// `POST /api/auth/login`
    ///
    /// On success the backend also sets a session cookie (kept in the
    /// shared jar). A returned bearer token is stored with its absolute
    /// expiry; a token with no expiry information is stored without one
    /// and presented until the backend answers 401. Any non-2xx answer becomes
    /// [`Error::Authentication`] carrying the backend's payload.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<LoginResponse, Error> {
        debug!(username, "logging in");
        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp: LoginResponse = match self.post("/api/auth/login", &body).await {
            Ok(resp) => resp,
            Err(Error::Validation { body }) => {
                return Err(Error::Authentication { status: 400, body });
            }
            Err(Error::Http { status, body }) => {
                return Err(Error::Authentication { status, body });
            }
            Err(e) => return Err(e),
        };

        if let Some(token) = resp.token.as_deref().filter(|t| !t.is_empty()) {
            match resolve_expiry(resp.expires_at.as_ref(), resp.ttl_seconds, Utc::now()) {
                Some(expires_at) => {
                    self.tokens()
                        .store(&SecretString::from(token.to_owned()), expires_at);
                }
                None => {
                    warn!("login returned a token without expiry; presenting it until rejected");
                    self.tokens()
                        .store_without_expiry(&SecretString::from(token.to_owned()));
                }
            }
        }

        info!(user = resp.user.as_deref().unwrap_or(username), "logged in");
        Ok(resp)
    }

    /// End the session.
    ///
    /// `POST /api/auth/logout`
    ///
    /// Best effort: the local token is purged whatever the backend says,
    /// and failures are only logged.
    pub async fn logout(&self) {
        let result: Result<serde_json::Value, Error> =
            self.post("/api/auth/logout", &json!({})).await;
        if let Err(e) = result {
            debug!(error = %e, "logout request failed, clearing local state anyway");
        }
        self.tokens().clear();
    }

    /// Identity of the current session.
    ///
    /// `GET /api/auth/me`
    pub async fn me(&self) -> Result<Identity, Error> {
        self.get("/api/auth/me").await
    }
}
