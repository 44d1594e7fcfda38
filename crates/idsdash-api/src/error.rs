use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Top-level error type for the `idsdash-api` crate.
///
/// Covers every failure mode of the REST surface and the push channel.
/// HTTP failures always carry the status code and the parsed JSON body
/// (an empty object when the backend sent something that is not JSON),
/// so callers can show the backend's own error payload verbatim.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected, or any request answered with HTTP 401.
    #[error("Authentication failed (HTTP {status}): {}", summarize(.body))]
    Authentication { status: u16, body: Value },

    // ── Request errors ──────────────────────────────────────────────
    /// HTTP 400: the backend rejected the request payload
    /// (unknown settings key, trusted IP guard, malformed address, ...).
    #[error("Validation failed: {}", summarize(.body))]
    Validation { body: Value },

    /// Any other non-2xx response.
    #[error("HTTP {status}: {}", summarize(.body))]
    Http { status: u16, body: Value },

    // ── Transport ───────────────────────────────────────────────────
    /// No response was obtained (connection refused, DNS failure, reset, ...).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A credential that cannot be sent as an HTTP header.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    // ── Data ────────────────────────────────────────────────────────
    /// A 2xx body that did not match the expected shape.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A push frame whose data was not valid JSON. Never propagated to
    /// subscribers; only logged by the event stream layer.
    #[error("Malformed `{event}` push payload: {message}")]
    MalformedPushPayload { event: String, message: String },

    /// Saving a download to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify a non-2xx response.
    pub fn from_status(status: StatusCode, body: Value) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Authentication {
                status: status.as_u16(),
                body,
            },
            StatusCode::BAD_REQUEST => Self::Validation { body },
            _ => Self::Http {
                status: status.as_u16(),
                body,
            },
        }
    }

    /// HTTP status code, if this error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::Validation { .. } => Some(400),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The structured error payload returned by the backend, if any.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Authentication { body, .. } | Self::Validation { body } | Self::Http { body, .. } => {
                Some(body)
            }
            _ => None,
        }
    }

    /// The backend's machine-readable error code (`{"error": "trusted_ip"}`).
    pub fn error_code(&self) -> Option<&str> {
        self.body()?.get("error")?.as_str()
    }

    /// Returns `true` if re-authenticating might resolve this error.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { status: 401, .. })
    }

    /// Returns `true` if the backend does not implement the operation (HTTP 501).
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Http { status: 501, .. })
    }

    /// Returns `true` for HTTP 409 (scan already running, IP currently blocked).
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Http { status: 409, .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }
}

/// One-line rendering of a backend error payload for `Display`.
fn summarize(body: &Value) -> String {
    let field = |key: &str| body.get(key).and_then(Value::as_str).map(String::from);
    match (field("error"), field("message")) {
        (Some(code), Some(message)) => format!("{code} ({message})"),
        (Some(code), None) => code,
        (None, Some(message)) => message,
        (None, None) => match body {
            Value::Object(map) if map.is_empty() => "no details".into(),
            Value::Null => "no details".into(),
            other => other.to_string(),
        },
    }
}
