// ── Push event types ──
//
// The backend feed carries three categories. Payloads are decoded into
// the same wire types the REST listings use.

use idsdash_api::models::{Alert, BlockEntry, ScanStatus, ScanStatusEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// A push event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EventKind {
    Alert,
    Block,
    Scan,
}

/// A decoded push event. Serializes as `{"type": "alert", "data": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum PushEvent {
    /// A new alert row.
    Alert(Alert),
    /// A block or unblock journal entry.
    Block(BlockEntry),
    /// Scan progress snapshot (sent wrapped as `{"scan": {...}}`).
    Scan(ScanStatus),
}

impl PushEvent {
    /// Decode a dispatched payload of the given category.
    pub fn decode(kind: EventKind, payload: &Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            EventKind::Alert => Self::Alert(Alert::deserialize(payload)?),
            EventKind::Block => Self::Block(BlockEntry::deserialize(payload)?),
            EventKind::Scan => Self::Scan(ScanStatusEnvelope::deserialize(payload)?.into_status()),
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Alert(_) => EventKind::Alert,
            Self::Block(_) => EventKind::Block,
            Self::Scan(_) => EventKind::Scan,
        }
    }
}
