// ── Dashboard facade ──
//
// Owns the API client and the event stream client for one backend and
// ties their lifecycles together: logging in refreshes the push
// connection's credentials, logging out or resetting tears it down.

use std::sync::Arc;

use idsdash_api::events::ReconnectConfig;
use idsdash_api::models::{LoginResponse, ScanRequest, ScanStarted, ScanStatus};
use idsdash_api::{ApiClient, TokenStore, TransportConfig};
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::event_stream::{EventStreamClient, PushConnector, StreamStatus, Subscription};
use crate::push_event::{EventKind, PushEvent};
use crate::scan::{ScanPollConfig, run_scan, wait_for_scan};

/// Default backend origin when nothing is configured.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";

// ── DashboardConfig ──────────────────────────────────────────────

/// Everything needed to talk to one backend.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub api_base: String,
    pub transport: TransportConfig,
    pub tokens: TokenStore,
    pub reconnect: ReconnectConfig,
    pub scan: ScanPollConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            transport: TransportConfig::default(),
            tokens: TokenStore::in_memory(),
            reconnect: ReconnectConfig::default(),
            scan: ScanPollConfig::default(),
        }
    }
}

// ── Dashboard ────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable: the API client and event stream client are both
/// shared handles. Nothing connects until used; the push feed opens on
/// the first subscription.
#[derive(Clone, Debug)]
pub struct Dashboard {
    api: ApiClient,
    events: EventStreamClient,
    scan: ScanPollConfig,
}

impl Dashboard {
    /// Build from configuration. Does NOT contact the backend.
    pub fn new(config: DashboardConfig) -> Result<Self, CoreError> {
        let api = ApiClient::new(&config.api_base, config.transport, config.tokens)?;
        let events = EventStreamClient::for_api(api.clone(), config.reconnect);
        Ok(Self {
            api,
            events,
            scan: config.scan,
        })
    }

    /// Build with a custom push connector (alternative transports, tests).
    pub fn with_connector(
        config: DashboardConfig,
        connector: Arc<dyn PushConnector>,
    ) -> Result<Self, CoreError> {
        let api = ApiClient::new(&config.api_base, config.transport, config.tokens)?;
        Ok(Self {
            api,
            events: EventStreamClient::new(connector),
            scan: config.scan,
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn events(&self) -> &EventStreamClient {
        &self.events
    }

    pub fn scan_config(&self) -> &ScanPollConfig {
        &self.scan
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Log in, then rebuild an open push connection so it carries the
    /// new credentials.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<LoginResponse, CoreError> {
        let resp = self.api.login(username, password).await?;
        if let Err(e) = self.events.reconnect() {
            warn!(error = %e, "could not refresh event stream after login");
        }
        Ok(resp)
    }

    /// Close the push feed and end the session. Never fails.
    pub async fn logout(&self) {
        self.events.close();
        self.api.logout().await;
        info!("logged out");
    }

    /// Drop every subscription and the local token without contacting
    /// the backend.
    pub fn reset(&self) {
        self.events.close();
        self.api.tokens().clear();
        debug!("dashboard state reset");
    }

    // ── Push events ──────────────────────────────────────────────

    /// Subscribe `handler` to typed events of every kind in `kinds`.
    ///
    /// Payloads that do not decode into the category's type are logged
    /// and skipped. Returns one subscription per kind.
    pub fn on_events<F>(&self, kinds: &[EventKind], handler: F) -> Result<Vec<Subscription>, CoreError>
    where
        F: Fn(PushEvent) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let mut subs = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let handler = Arc::clone(&handler);
            let sub = self.events.on(kind, move |payload| match PushEvent::decode(kind, payload) {
                Ok(event) => handler(event),
                Err(e) => warn!(%kind, error = %e, "push payload does not match its category"),
            });
            match sub {
                Ok(sub) => subs.push(sub),
                Err(e) => {
                    subs.iter().for_each(Subscription::unsubscribe);
                    return Err(e);
                }
            }
        }
        Ok(subs)
    }

    /// Observe the push connection state.
    pub fn connection_state(&self) -> watch::Receiver<StreamStatus> {
        self.events.watch_status()
    }

    // ── Scans ────────────────────────────────────────────────────

    /// Start a scan and poll it to completion with the configured cadence.
    pub async fn scan<F>(&self, request: &ScanRequest, on_progress: F) -> Result<(ScanStarted, ScanStatus), CoreError>
    where
        F: FnMut(&ScanStatus),
    {
        run_scan(&self.api, request, &self.scan, on_progress).await
    }

    /// Wait for the scan already in progress.
    pub async fn wait_for_scan<F>(&self, on_progress: F) -> Result<ScanStatus, CoreError>
    where
        F: FnMut(&ScanStatus),
    {
        wait_for_scan(&self.api, &self.scan, on_progress).await
    }
}
