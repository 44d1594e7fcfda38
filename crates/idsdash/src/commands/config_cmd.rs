//! Config subcommand handlers. None of these contact the backend.

use idsdash_config::{Preferences, Theme};
use serde::Serialize;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, ThemeArg};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Paths {
    config: String,
    state: String,
}

#[derive(Serialize)]
struct Resolved {
    effective_api_base: String,
    api_base_source: &'static str,
    theme: String,
    config: idsdash_config::Config,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Dark => Self::Dark,
            ThemeArg::Light => Self::Light,
        }
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn keyring_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "keyring".into(),
        reason: e.to_string(),
    }
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_effective_config(global)?;
            let prefs = Preferences::new(config::open_state()?);
            let api_base = idsdash_config::resolve_api_base(global.api_base.as_deref(), &prefs, &cfg)?;
            let source = if global.api_base.is_some() {
                "flag"
            } else if prefs.api_base_override().is_some() {
                "saved"
            } else {
                "config"
            };
            let resolved = Resolved {
                effective_api_base: api_base,
                api_base_source: source,
                theme: prefs.theme().to_string(),
                config: cfg,
            };
            let out = output::render_single(
                global.output,
                &resolved,
                |r| {
                    let header = format!(
                        "# api_base in use: {} ({})\n# theme: {}\n",
                        r.effective_api_base, r.api_base_source, r.theme
                    );
                    match r.config.to_toml() {
                        Ok(toml) => format!("{header}{toml}"),
                        Err(e) => format!("{header}# config could not be rendered: {e}"),
                    }
                },
                |r| r.effective_api_base.clone(),
            );
            output::print_output(&out, global.quiet);
        }

        ConfigCommand::Path => {
            let paths = Paths {
                config: idsdash_config::config_path().display().to_string(),
                state: idsdash_config::state_path().display().to_string(),
            };
            let out = output::render_single(
                global.output,
                &paths,
                |p| format!("config  {}\nstate   {}", p.config, p.state),
                |p| p.config.clone(),
            );
            output::print_output(&out, global.quiet);
        }

        ConfigCommand::SetBase { url } => {
            let prefs = Preferences::new(config::open_state()?);
            let saved = prefs.set_api_base_override(&url)?;
            output::status(&format!("API base set to {saved}"), global.quiet);
        }

        ConfigCommand::ClearBase => {
            let prefs = Preferences::new(config::open_state()?);
            prefs.clear_api_base_override();
            output::status("Saved API base cleared", global.quiet);
        }

        ConfigCommand::Theme { theme } => {
            let prefs = Preferences::new(config::open_state()?);
            if let Some(theme) = theme {
                prefs.set_theme(theme.into());
            }
            output::print_output(&prefs.theme().to_string(), global.quiet);
        }

        ConfigCommand::SetPassword { username } => {
            let cfg = config::load_effective_config(global)?;
            let username = config::resolve_username(username, &cfg)?;
            let password = rpassword::prompt_password(format!("Password for {username}: "))
                .map_err(prompt_err)?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            let entry = keyring::Entry::new(idsdash_config::KEYRING_SERVICE, &username)
                .map_err(keyring_err)?;
            entry.set_password(&password).map_err(keyring_err)?;
            output::status(&format!("Password for {username} stored in the system keyring"), global.quiet);
        }
    }
    Ok(())
}
