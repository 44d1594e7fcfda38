//! CLI error types with miette diagnostics.
//!
//! Maps API, core and config errors into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use idsdash_config::ConfigError;
use idsdash_core::CoreError;
use idsdash_core::api::Error as ApiError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const UNSUPPORTED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the backend at {url}")]
    #[diagnostic(
        code(idsdash::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Show the resolved base with: idsdash config show\n\
             Override it with: --api-base http://host:5000"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {reason}")]
    #[diagnostic(
        code(idsdash::tls_error),
        help(
            "For a self-signed backend use --insecure (-k),\n\
             or point ca_cert in config.toml at its CA certificate."
        )
    )]
    TlsError { reason: String },

    #[error("Live feed unavailable: {message}")]
    #[diagnostic(code(idsdash::stream))]
    Stream { message: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(
        code(idsdash::auth_failed),
        help("Log in again with: idsdash login")
    )]
    AuthFailed { message: String },

    #[error("No password available for '{username}'")]
    #[diagnostic(
        code(idsdash::no_password),
        help(
            "Pass --password, set IDSDASH_PASSWORD, or store one with:\n\
             idsdash config set-password --username {username}"
        )
    )]
    NoPassword { username: String },

    // ── Backend answers ──────────────────────────────────────────────

    #[error("Backend rejected the request: {message}")]
    #[diagnostic(code(idsdash::rejected))]
    Rejected { message: String },

    #[error("{message}")]
    #[diagnostic(code(idsdash::not_found))]
    NotFound { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(idsdash::conflict),
        help("A scan may already be running, or the address is currently blocked.")
    )]
    Conflict { message: String },

    #[error("The backend does not support this operation ({message})")]
    #[diagnostic(code(idsdash::unsupported))]
    Unsupported { message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(idsdash::api_error))]
    ApiError { message: String },

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(idsdash::protocol))]
    Protocol { message: String },

    #[error("Scan ended in state '{state}'{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    #[diagnostic(code(idsdash::scan_failed))]
    ScanFailed {
        state: String,
        message: Option<String>,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(idsdash::validation))]
    Validation { field: String, reason: String },

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(idsdash::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(idsdash::config),
        help("Config file: {path}")
    )]
    Config { message: String, path: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(
        code(idsdash::timeout),
        help("Increase the limit with --timeout or check backend responsiveness.")
    )]
    Timeout { message: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(idsdash::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } | Self::Stream { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } | Self::NoPassword { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Validation { .. }
            | Self::Rejected { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ApiError → CliError mapping ──────────────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        let message = err.to_string();
        match err {
            ApiError::Authentication { .. } => Self::AuthFailed { message },
            ApiError::Validation { .. } => Self::Rejected { message },
            ApiError::Http { status: 404, .. } => Self::NotFound { message },
            ApiError::Http { status: 409, .. } => Self::Conflict { message },
            ApiError::Http { status: 501, .. } => Self::Unsupported { message },
            ApiError::Http { .. } => Self::ApiError { message },
            ApiError::Transport(e) if e.is_timeout() => Self::Timeout { message },
            ApiError::Transport(e) => Self::ConnectionFailed {
                url: e.url().map_or_else(|| "(unknown)".into(), ToString::to_string),
                source: Box::new(e),
            },
            ApiError::InvalidUrl(e) => Self::Validation {
                field: "api_base".into(),
                reason: e.to_string(),
            },
            ApiError::Tls(reason) => Self::TlsError { reason },
            ApiError::InvalidHeader(reason) => Self::Validation {
                field: "token".into(),
                reason,
            },
            ApiError::Deserialization { .. } | ApiError::MalformedPushPayload { .. } => {
                Self::Protocol { message }
            }
            ApiError::Io(e) => Self::Io(e),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api(e) => e.into(),
            e @ CoreError::ScanTimeout { .. } => Self::Timeout {
                message: e.to_string(),
            },
            CoreError::Stream { message } => Self::Stream { message },
            CoreError::Config { message } => Self::Config {
                message,
                path: idsdash_config::config_path().display().to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoPassword { username } => Self::NoPassword { username },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
                path: idsdash_config::config_path().display().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn backend_statuses_map_to_exit_codes() {
        let cases = [
            (ApiError::Authentication { status: 401, body: json!({}) }, exit_code::AUTH),
            (ApiError::Validation { body: json!({"error": "bad_ip"}) }, exit_code::USAGE),
            (ApiError::Http { status: 404, body: json!({}) }, exit_code::NOT_FOUND),
            (ApiError::Http { status: 409, body: json!({}) }, exit_code::CONFLICT),
            (ApiError::Http { status: 501, body: json!({}) }, exit_code::UNSUPPORTED),
            (ApiError::Http { status: 500, body: json!({}) }, exit_code::GENERAL),
        ];
        for (err, code) in cases {
            assert_eq!(CliError::from(err).exit_code(), code);
        }
    }

    #[test]
    fn scan_timeout_is_a_timeout() {
        let err = CliError::from(CoreError::ScanTimeout {
            timeout: std::time::Duration::from_secs(90),
            last_progress: 40,
        });
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);
        assert!(err.to_string().contains("40%"));
    }
}
