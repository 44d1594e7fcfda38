//! Shared helpers for command handlers.

use std::io::IsTerminal;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so `--yes` is required.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Split `Section.Key=value` into its parts.
pub fn parse_setting(pair: &str) -> Result<(String, String), CliError> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(CliError::Validation {
            field: "setting".into(),
            reason: format!("expected Section.Key=value, got '{pair}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_pairs_split_on_first_equals() {
        let (key, value) = parse_setting("Detection.Threshold=a=b").unwrap_or_default();
        assert_eq!(key, "Detection.Threshold");
        assert_eq!(value, "a=b");
    }

    #[test]
    fn setting_without_key_is_rejected() {
        assert!(parse_setting("=5").is_err());
        assert!(parse_setting("Detection.Threshold").is_err());
    }

    #[test]
    fn empty_value_is_allowed() {
        assert!(matches!(parse_setting("Net.Iface="), Ok((_, v)) if v.is_empty()));
    }
}
