//! Alert listing.

use idsdash_core::Dashboard;
use idsdash_core::api::models::Alert;
use tabled::Tabled;

use crate::cli::{AlertsArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Source")]
    src_ip: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Label")]
    label: String,
}

impl From<&Alert> for AlertRow {
    fn from(a: &Alert) -> Self {
        Self {
            time: output::or_dash(a.ts.as_deref()),
            src_ip: output::or_dash(a.src_ip.as_deref()),
            severity: output::or_dash(a.severity.as_deref()),
            kind: output::or_dash(a.kind.as_deref()),
            label: output::or_dash(a.label.as_deref()),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: AlertsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let page = dashboard
        .api()
        .list_alerts(Some(args.limit), args.cursor.as_deref())
        .await?;

    let out = output::render_list(global.output, &page.items, |x| AlertRow::from(x), |a| a.id.clone());
    output::print_output(&out, global.quiet);

    if let Some(ref cursor) = page.next_cursor {
        if global.output == OutputFormat::Table {
            output::status(&format!("More results: --cursor {cursor}"), global.quiet);
        }
    }
    Ok(())
}
