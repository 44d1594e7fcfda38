//! Backend settings.

use std::collections::BTreeMap;

use idsdash_core::Dashboard;
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct Setting {
    key: String,
    value: Value,
}

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<&Setting> for SettingRow {
    fn from(s: &Setting) -> Self {
        Self {
            key: s.key.clone(),
            value: display_value(&s.value),
        }
    }
}

pub async fn handle(
    dashboard: &Dashboard,
    args: SettingsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let api = dashboard.api();
    match args.command {
        SettingsCommand::Get { key } => {
            let mut all = api.get_settings().await?;
            if let Some(key) = key {
                let value = all.remove(&key).ok_or_else(|| CliError::NotFound {
                    message: format!("setting '{key}' not found"),
                })?;
                all = BTreeMap::from([(key, value)]);
            }
            let settings: Vec<Setting> = all
                .into_iter()
                .map(|(key, value)| Setting { key, value })
                .collect();
            let out = output::render_list(global.output, &settings, |x| SettingRow::from(x), |s| {
                format!("{}={}", s.key, display_value(&s.value))
            });
            output::print_output(&out, global.quiet);
        }

        SettingsCommand::Set { pairs } => {
            let updates = pairs
                .iter()
                .map(|pair| util::parse_setting(pair))
                .collect::<Result<BTreeMap<_, _>, _>>()?;
            api.put_settings(&updates).await?;
            output::status(&format!("Updated {} setting(s)", updates.len()), global.quiet);
        }
    }
    Ok(())
}
