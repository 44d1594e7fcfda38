//! Shared configuration for the idsdash CLI and library consumers.
//!
//! TOML config with `IDSDASH_` environment overrides, the file-backed
//! store for client-side persisted state (token, API base override,
//! theme), password resolution (flag + env + keyring), and translation
//! to `idsdash_core::DashboardConfig`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use idsdash_core::api::auth::{API_BASE_KEY, THEME_KEY};
use idsdash_core::api::events::ReconnectConfig;
use idsdash_core::api::{KeyValueStore, TlsMode, TokenStore, TransportConfig};
use idsdash_core::{DEFAULT_API_BASE, DashboardConfig, ScanPollConfig};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Keyring service name for stored passwords.
pub const KEYRING_SERVICE: &str = "idsdash";

/// Environment variable consulted for the login password.
pub const PASSWORD_ENV: &str = "IDSDASH_PASSWORD";

const ENV_PREFIX: &str = "IDSDASH_";
const STATE_FILE: &str = "state.json";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password available for '{username}'")]
    NoPassword { username: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("state file is unreadable: {0}")]
    State(#[from] serde_json::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Backend origin, e.g. "http://127.0.0.1:5000".
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Accept any TLS certificate.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate (PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Per-request timeout in seconds; 0 disables it.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Default login user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default)]
    pub reconnect: ReconnectSettings,

    #[serde(default)]
    pub scan: ScanSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            insecure: false,
            ca_cert: None,
            timeout: default_timeout(),
            username: None,
            reconnect: ReconnectSettings::default(),
            scan: ScanSettings::default(),
        }
    }
}

/// Push connection backoff policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconnectSettings {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Consecutive failures before the feed is reported degraded;
    /// 0 retries forever.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

/// Scan progress polling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScanSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_scan_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_scan_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_initial_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_max_retries() -> u32 {
    10
}
fn default_poll_interval_ms() -> u64 {
    800
}
fn default_scan_timeout_secs() -> u64 {
    90
}

impl Config {
    pub fn transport(&self) -> TransportConfig {
        let tls = if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca) = self.ca_cert {
            TlsMode::CustomCa(ca.clone())
        } else {
            TlsMode::System
        };
        TransportConfig {
            tls,
            timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
            ..TransportConfig::default()
        }
    }

    pub fn reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig {
            initial_delay: Duration::from_millis(self.reconnect.initial_delay_ms),
            max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
            max_retries: (self.reconnect.max_retries > 0).then_some(self.reconnect.max_retries),
        }
    }

    pub fn scan_config(&self) -> ScanPollConfig {
        ScanPollConfig {
            interval: Duration::from_millis(self.scan.poll_interval_ms),
            timeout: Duration::from_secs(self.scan.timeout_secs),
        }
    }

    /// Build a `DashboardConfig` against `api_base` with tokens kept in
    /// `tokens`.
    pub fn to_dashboard_config(&self, api_base: String, tokens: TokenStore) -> DashboardConfig {
        DashboardConfig {
            api_base,
            transport: self.transport(),
            tokens,
            reconnect: self.reconnect_config(),
            scan: self.scan_config(),
        }
    }

    /// Render as TOML, the same shape `config.toml` accepts.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "idsdash", "idsdash")
}

fn dirs_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("idsdash");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where client-side persisted state (`state.json`) lives.
pub fn state_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join(STATE_FILE),
        |dirs| dirs.data_dir().join(STATE_FILE),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing file is fine) + environment.
///
/// Nested keys use a double underscore: `IDSDASH_SCAN__TIMEOUT_SECS=120`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), api_base = %config.api_base, "config loaded");
    Ok(config)
}

// ── FileStore ───────────────────────────────────────────────────────

/// [`KeyValueStore`] persisted as a flat JSON object on disk.
///
/// Every write rewrites the whole file through a temp file in the same
/// directory, so a crash never leaves a half-written state file. Temp
/// files are created owner-only on unix, which keeps the stored token
/// private.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl fmt::Debug for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileStore {
    /// Open `path`, starting empty when it does not exist yet.
    ///
    /// A corrupt file is logged and treated as empty; it is replaced on
    /// the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "state file is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Open the canonical [`state_path`].
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::open(state_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, entries)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if !apply(&mut entries) {
            return;
        }
        if let Err(e) = self.flush(&entries) {
            warn!(path = %self.path.display(), error = %e, "failed to persist client state");
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.update(|entries| {
            entries.insert(key.to_owned(), value.to_owned()).as_deref() != Some(value)
        });
    }

    fn remove(&self, key: &str) {
        self.update(|entries| entries.remove(key).is_some());
    }
}

// ── Preferences ─────────────────────────────────────────────────────

/// UI colour scheme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Persisted user preferences that live next to the token.
#[derive(Debug, Clone)]
pub struct Preferences {
    kv: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Stored theme; unknown values fall back to the default.
    pub fn theme(&self) -> Theme {
        self.kv
            .get(THEME_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) {
        self.kv.set(THEME_KEY, theme.as_ref());
    }

    pub fn api_base_override(&self) -> Option<String> {
        self.kv
            .get(API_BASE_KEY)
            .filter(|raw| !raw.trim().is_empty())
    }

    /// Persist an API base override after checking it is an http(s) URL.
    pub fn set_api_base_override(&self, base: &str) -> Result<String, ConfigError> {
        let normalized = validate_api_base(base)?;
        self.kv.set(API_BASE_KEY, &normalized);
        Ok(normalized)
    }

    pub fn clear_api_base_override(&self) {
        self.kv.remove(API_BASE_KEY);
    }
}

fn validate_api_base(base: &str) -> Result<String, ConfigError> {
    let trimmed = base.trim().trim_end_matches('/');
    let url: url::Url = trimmed.parse().map_err(|_| ConfigError::Validation {
        field: "api_base".into(),
        reason: format!("invalid URL: {base}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api_base".into(),
            reason: format!("expected http or https, got '{}'", url.scheme()),
        });
    }
    Ok(trimmed.to_owned())
}

// ── Resolution ──────────────────────────────────────────────────────

/// Pick the API base: explicit flag > persisted override > config.
pub fn resolve_api_base(
    flag: Option<&str>,
    prefs: &Preferences,
    config: &Config,
) -> Result<String, ConfigError> {
    match flag {
        Some(base) => validate_api_base(base),
        None => Ok(prefs
            .api_base_override()
            .unwrap_or_else(|| config.api_base.trim_end_matches('/').to_owned())),
    }
}

/// Resolve a login password without prompting: flag > env > keyring.
///
/// Interactive prompting is left to the caller.
pub fn resolve_password(
    flag: Option<SecretString>,
    username: &str,
) -> Result<SecretString, ConfigError> {
    if let Some(pw) = flag {
        return Ok(pw);
    }

    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, username) {
        if let Ok(pw) = entry.get_password() {
            debug!(username, "password from keyring");
            return Ok(SecretString::from(pw));
        }
    }

    Err(ConfigError::NoPassword {
        username: username.into(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn memory_prefs() -> Preferences {
        Preferences::new(Arc::new(idsdash_core::api::MemoryStore::new()))
    }

    #[test]
    fn defaults_without_file() {
        Jail::expect_with(|_| {
            let config = load_config_from(Path::new("missing.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config, Config::default());
            assert_eq!(config.api_base, "http://127.0.0.1:5000");
            Ok(())
        });
    }

    #[test]
    fn file_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    api_base = "http://ids.lan:5000"
                    timeout = 0

                    [reconnect]
                    max_retries = 3

                    [scan]
                    timeout_secs = 30
                "#,
            )?;
            jail.set_env("IDSDASH_SCAN__TIMEOUT_SECS", "120");
            jail.set_env("IDSDASH_INSECURE", "true");

            let config = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.api_base, "http://ids.lan:5000");
            assert_eq!(config.scan.timeout_secs, 120);
            assert_eq!(config.scan.poll_interval_ms, 800);
            assert_eq!(config.reconnect.max_retries, 3);
            assert!(config.insecure);

            let transport = config.transport();
            assert!(transport.timeout.is_none());
            assert!(matches!(transport.tls, TlsMode::DangerAcceptInvalid));
            Ok(())
        });
    }

    #[test]
    fn zero_retries_means_forever() {
        let mut config = Config::default();
        assert_eq!(config.reconnect_config().max_retries, Some(10));
        config.reconnect.max_retries = 0;
        assert_eq!(config.reconnect_config().max_retries, None);
    }

    #[test]
    fn toml_rendering_round_trips_through_loader() {
        Jail::expect_with(|jail| {
            let config = Config {
                username: Some("admin".into()),
                ..Config::default()
            };
            jail.create_file("config.toml", &config.to_toml().map_err(|e| e.to_string())?)?;
            let loaded = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(loaded, config);
            Ok(())
        });
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(STATE_FILE);

        let store = FileStore::open(&path).unwrap();
        store.set("ids_token", "abc");
        store.set("ids_theme", "light");
        store.remove("ids_theme");

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("ids_token").as_deref(), Some("abc"));
        assert_eq!(reopened.get("ids_theme"), None);

        // no temp files left next to the state file
        let names: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, [std::ffi::OsString::from(STATE_FILE)]);
    }

    #[test]
    fn corrupt_state_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATE_FILE);
        fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("ids_token"), None);
        store.set("ids_token", "t");
        assert_eq!(FileStore::open(&path).unwrap().get("ids_token").as_deref(), Some("t"));
    }

    #[test]
    fn theme_defaults_and_parses_loosely() {
        let prefs = memory_prefs();
        assert_eq!(prefs.theme(), Theme::Dark);
        prefs.set_theme(Theme::Light);
        assert_eq!(prefs.theme(), Theme::Light);
        prefs.kv.set(THEME_KEY, "LIGHT");
        assert_eq!(prefs.theme(), Theme::Light);
        prefs.kv.set(THEME_KEY, "sepia");
        assert_eq!(prefs.theme(), Theme::Dark);
    }

    #[test]
    fn api_base_precedence() {
        let prefs = memory_prefs();
        let config = Config {
            api_base: "http://from-config:5000/".into(),
            ..Config::default()
        };

        assert_eq!(resolve_api_base(None, &prefs, &config).unwrap(), "http://from-config:5000");

        prefs.set_api_base_override("http://override:8080/").unwrap();
        assert_eq!(resolve_api_base(None, &prefs, &config).unwrap(), "http://override:8080");

        assert_eq!(
            resolve_api_base(Some("https://flag"), &prefs, &config).unwrap(),
            "https://flag"
        );

        prefs.clear_api_base_override();
        assert_eq!(resolve_api_base(None, &prefs, &config).unwrap(), "http://from-config:5000");
    }

    #[test]
    fn api_base_override_rejects_non_http() {
        let prefs = memory_prefs();
        let err = prefs.set_api_base_override("ftp://x").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert!(prefs.api_base_override().is_none());
    }

    #[test]
    fn password_flag_wins() {
        let pw = resolve_password(Some(SecretString::from("s3cret".to_string())), "admin").unwrap();
        assert_eq!(pw.expose_secret(), "s3cret");
    }
}
