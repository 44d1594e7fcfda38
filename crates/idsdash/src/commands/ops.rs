//! Operational endpoints: health, retention, backup, reset.

use bytesize::ByteSize;
use idsdash_core::Dashboard;
use idsdash_core::api::models::Health;
use serde::Serialize;
use serde_json::Value;

use crate::cli::{GlobalOpts, OpsArgs, OpsCommand};
use crate::error::CliError;
use crate::output::{self, Palette};

use super::util;

#[derive(Serialize)]
struct BackupSummary {
    path: String,
    bytes: u64,
}

fn health_detail(h: &Health) -> String {
    output::detail_lines(&[
        ("Ok", Some(h.ok.to_string())),
        (
            "Uptime",
            h.uptime_sec.map(|s| format!("{}h {}m {}s", s / 3600, (s % 3600) / 60, s % 60)),
        ),
        ("Time", h.time.clone()),
    ])
}

/// Render a free-form JSON report (`deleted`, `cleared`) as `key: value` lines.
fn report_detail(report: Option<&Value>) -> String {
    match report {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

pub async fn handle(
    dashboard: &Dashboard,
    args: OpsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let api = dashboard.api();
    let palette = Palette::new(global.color);
    match args.command {
        OpsCommand::Health => {
            let health = api.health().await?;
            let out = output::render_single(global.output, &health, health_detail, |h| {
                if h.ok { "ok" } else { "down" }.to_owned()
            });
            output::print_output(&out, global.quiet);
        }

        OpsCommand::Retention => {
            let report = api.run_retention().await?;
            output::status(&palette.ok("Retention applied"), global.quiet);
            let out = output::render_single(
                global.output,
                &report,
                |r| report_detail(r.deleted.as_ref()),
                |r| r.ok.to_string(),
            );
            output::print_output(&out, global.quiet);
        }

        OpsCommand::Backup { dir } => {
            let path = api.download_backup(&dir).await?;
            let bytes = std::fs::metadata(&path)?.len();
            let summary = BackupSummary {
                path: path.display().to_string(),
                bytes,
            };
            let out = output::render_single(
                global.output,
                &summary,
                |s| format!("{} ({})", s.path, ByteSize(s.bytes)),
                |s| s.path.clone(),
            );
            output::print_output(&out, global.quiet);
        }

        OpsCommand::Reset => {
            if !util::confirm(
                "Delete all alerts, blocks, devices and trusted IPs?",
                "ops reset",
                global.yes,
            )? {
                return Ok(());
            }
            let report = api.reset_data().await?;
            output::status(&palette.warn("Backend data cleared"), global.quiet);
            let out = output::render_single(
                global.output,
                &report,
                |r| report_detail(r.cleared.as_ref()),
                |r| r.ok.to_string(),
            );
            output::print_output(&out, global.quiet);
        }
    }
    Ok(())
}
