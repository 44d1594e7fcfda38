// Wire types for the dashboard backend.
//
// Field sets follow what the backend actually emits. Every entity keeps
// an `extra` map so columns added server-side are never silently dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

// ── Auth ─────────────────────────────────────────────────────────────

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    /// RFC 3339 string or epoch number; see [`crate::auth::resolve_expiry`].
    #[serde(default)]
    pub expires_at: Option<Value>,
    #[serde(default)]
    pub ttl_seconds: Option<i64>,
}

/// Body of `GET /api/auth/me`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Identity {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

// ── Listings ───────────────────────────────────────────────────────────

/// A listing answered either as a bare array or as `{ok, items: [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Bare(Vec<T>),
    Wrapped { items: Vec<T> },
}

impl<T> Listing<T> {
    pub(crate) fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { items } => items,
        }
    }
}

// ── Alerts ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Alert {
    pub id: String,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub src_ip: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One page of alerts.
///
/// The backend answers either with a bare array or with
/// `{items, next_cursor}`; both decode into this shape.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertPage {
    pub items: Vec<Alert>,
    pub next_cursor: Option<String>,
}

impl<'de> Deserialize<'de> for AlertPage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Bare(Vec<Alert>),
            Paged {
                #[serde(default, alias = "alerts")]
                items: Vec<Alert>,
                #[serde(default, alias = "cursor")]
                next_cursor: Option<String>,
            },
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Bare(items) => Self {
                items,
                next_cursor: None,
            },
            Wire::Paged { items, next_cursor } => Self { items, next_cursor },
        })
    }
}

// ── Blocks ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BlockAction {
    Block,
    Unblock,
}

/// One row of the block/unblock journal (newest first).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockEntry {
    pub id: String,
    #[serde(default)]
    pub ts: Option<String>,
    pub ip: String,
    pub action: BlockAction,
    #[serde(default)]
    pub reason: Option<String>,
    /// Empty or absent for permanent blocks.
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl BlockEntry {
    /// A temporary ban carries a non-empty expiry.
    pub fn is_temporary(&self) -> bool {
        self.expires_at.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Request body for `POST /api/blocks`.
#[derive(Debug, Clone, Serialize)]
pub struct BlockRequest {
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

/// Acknowledgement of a block/unblock, with the firewall outcome.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockOutcome {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub firewall: Option<Value>,
}

// ── Trusted IPs ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrustedIp {
    pub ip: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub created_ts: Option<String>,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Device {
    pub ip: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub first_seen: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
    /// Comma-separated port list as stored by the scanner (`"22,80"`).
    #[serde(default)]
    pub open_ports: Option<String>,
    #[serde(default)]
    pub risk: Option<String>,
    #[serde(default)]
    pub last_scan_ts: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Device {
    /// Parsed open ports; malformed entries are skipped.
    pub fn ports(&self) -> Vec<u16> {
        self.open_ports
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|p| p.trim().parse().ok())
            .collect()
    }
}

// ── Logs ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogEvent {
    pub id: String,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Export file format for `/api/logs/export`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    /// File name the export is saved under.
    pub fn file_name(self) -> String {
        format!("ids_logs.{self}")
    }
}

// ── Settings ─────────────────────────────────────────────────────────

/// Body of `GET /api/settings`. Keys are `Section.Key`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SettingsEnvelope {
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

// ── Scan ─────────────────────────────────────────────────────────────

/// Lifecycle of the backend's network scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScanState {
    Idle,
    Running,
    Done,
    Error,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl ScanState {
    /// `done`, `error` and `canceled` end a scan; polling stops there.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Canceled)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanStatus {
    #[serde(rename = "status")]
    pub state: ScanState,
    /// Percent complete, 0..=100.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub started: Option<String>,
    #[serde(default)]
    pub finished: Option<String>,
    #[serde(default)]
    pub done: Option<u32>,
    #[serde(default)]
    pub targets: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub last_scan_ts: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Body of `GET /api/scan/status`: `{ok, scan: {...}}` or the bare status.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ScanStatusEnvelope {
    Wrapped { scan: ScanStatus },
    Bare(ScanStatus),
}

impl ScanStatusEnvelope {
    pub fn into_status(self) -> ScanStatus {
        match self {
            Self::Wrapped { scan } | Self::Bare(scan) => scan,
        }
    }
}

/// Options for `POST /api/scan`. Empty means "scan known devices".
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanRequest {
    /// Single IP or CIDR to scan instead of the device inventory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanStarted {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub targets: Option<u32>,
    #[serde(default)]
    pub ports: Vec<u16>,
}

// ── Ops ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Health {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub uptime_sec: Option<u64>,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionReport {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub deleted: Option<Value>,
    #[serde(default)]
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResetReport {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub cleared: Option<Value>,
}
