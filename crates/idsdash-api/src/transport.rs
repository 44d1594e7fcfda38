// Shared transport configuration for building reqwest::Client instances.
//
// The REST client and the push channel share TLS settings and the cookie
// jar through this module. They differ only in timeouts: a push
// connection is long-lived and must never carry a total request timeout.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;

use crate::error::Error;

const USER_AGENT: &str = concat!("idsdash/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (self-signed lab deployments).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Total per-request timeout for REST calls. `None` defers to the
    /// transport's defaults (no deadline).
    pub timeout: Option<Duration>,
    /// Connect timeout, applied to REST calls and push connections alike.
    pub connect_timeout: Duration,
    /// Session cookie jar. Always present: cookies are the fallback
    /// credential whenever no bearer token is held.
    pub cookie_jar: Arc<Jar>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            cookie_jar: Arc::new(Jar::default()),
        }
    }
}

impl TransportConfig {
    /// Build the client used for REST calls.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = self.builder()?;
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Build the client used for the long-lived push connection.
    ///
    /// Shares the cookie jar with [`build_client`](Self::build_client) but
    /// never sets a total timeout.
    pub fn build_stream_client(&self) -> Result<reqwest::Client, Error> {
        self.builder()?
            .build()
            .map_err(|e| Error::Tls(format!("failed to build push client: {e}")))
    }

    fn builder(&self) -> Result<reqwest::ClientBuilder, Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(USER_AGENT)
            .cookie_provider(Arc::clone(&self.cookie_jar));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        Ok(builder)
    }
}
