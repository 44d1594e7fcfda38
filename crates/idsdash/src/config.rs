//! CLI-aware configuration: applies global flags on top of
//! `idsdash_config` and builds the dashboard every command runs against.

use std::io::IsTerminal;
use std::sync::Arc;

use idsdash_config::{Config, ConfigError, FileStore, Preferences};
use idsdash_core::Dashboard;
use idsdash_core::api::{KeyValueStore, TokenStore};
use secrecy::SecretString;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a backend-bound command needs.
pub struct Context {
    pub dashboard: Dashboard,
    pub config: Config,
}

/// Load config.toml + env, apply flag overrides.
pub fn load_effective_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = idsdash_config::load_config()?;
    if global.insecure {
        cfg.insecure = true;
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout = timeout;
    }
    Ok(cfg)
}

/// The persisted client state, shared by the token store and preferences.
pub fn open_state() -> Result<Arc<dyn KeyValueStore>, CliError> {
    Ok(Arc::new(FileStore::open_default()?))
}

/// Build the dashboard for the resolved API base. Does not touch the network.
pub fn build_context(global: &GlobalOpts) -> Result<Context, CliError> {
    let config = load_effective_config(global)?;
    let state = open_state()?;
    let prefs = Preferences::new(Arc::clone(&state));
    let api_base = idsdash_config::resolve_api_base(global.api_base.as_deref(), &prefs, &config)?;

    tracing::debug!(%api_base, "building dashboard");
    let dashboard = Dashboard::new(config.to_dashboard_config(api_base, TokenStore::new(state)))?;
    Ok(Context { dashboard, config })
}

/// Username from the flag, then config.toml, then an interactive prompt.
pub fn resolve_username(flag: Option<String>, config: &Config) -> Result<String, CliError> {
    if let Some(user) = flag.or_else(|| config.username.clone()) {
        return Ok(user);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "username".into(),
            reason: "pass --username or set `username` in config.toml".into(),
        });
    }
    dialoguer::Input::<String>::new()
        .with_prompt("Username")
        .interact_text()
        .map_err(|e| CliError::Validation {
            field: "username".into(),
            reason: format!("prompt failed: {e}"),
        })
}

/// Password from the flag, `IDSDASH_PASSWORD`, the keyring, then a prompt.
pub fn resolve_login_password(
    flag: Option<String>,
    username: &str,
) -> Result<SecretString, CliError> {
    match idsdash_config::resolve_password(flag.map(SecretString::from), username) {
        Ok(password) => Ok(password),
        Err(ConfigError::NoPassword { .. }) if std::io::stdin().is_terminal() => {
            let entered = rpassword::prompt_password(format!("Password for {username}: "))?;
            Ok(SecretString::from(entered))
        }
        Err(e) => Err(e.into()),
    }
}
