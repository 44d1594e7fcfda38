// ── Core error types ──
//
// Errors surfaced by idsdash-core. API failures pass through unchanged
// (callers inspect status and payload via `idsdash_api::Error`); the
// core layer adds its own failure modes on top.

use std::time::Duration;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Backend errors ───────────────────────────────────────────────
    #[error(transparent)]
    Api(#[from] idsdash_api::Error),

    // ── Scan tracking ────────────────────────────────────────────────
    /// The scan did not reach `done`, `error` or `canceled` in time.
    #[error("Scan did not finish within {}s (last progress {last_progress}%)", .timeout.as_secs())]
    ScanTimeout { timeout: Duration, last_progress: u8 },

    // ── Event stream ─────────────────────────────────────────────────
    /// The push connection could not be started.
    #[error("Event stream unavailable: {message}")]
    Stream { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// The wrapped API error, if this is one.
    pub fn api(&self) -> Option<&idsdash_api::Error> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}
