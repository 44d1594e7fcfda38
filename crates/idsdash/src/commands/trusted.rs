//! Trusted address management.

use idsdash_core::Dashboard;
use idsdash_core::api::models::TrustedIp;
use tabled::Tabled;

use crate::cli::{GlobalOpts, TrustedArgs, TrustedCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct TrustedRow {
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Note")]
    note: String,
    #[tabled(rename = "Added")]
    created: String,
}

impl From<&TrustedIp> for TrustedRow {
    fn from(t: &TrustedIp) -> Self {
        Self {
            ip: t.ip.clone(),
            note: output::or_dash(t.note.as_deref()),
            created: output::or_dash(t.created_ts.as_deref()),
        }
    }
}

pub async fn handle(
    dashboard: &Dashboard,
    args: TrustedArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let api = dashboard.api();
    match args.command {
        TrustedCommand::List => {
            let trusted = api.list_trusted().await?;
            let out = output::render_list(global.output, &trusted, |x| TrustedRow::from(x), |t| t.ip.clone());
            output::print_output(&out, global.quiet);
        }
        TrustedCommand::Add { ip, note } => {
            api.add_trusted(&ip, note.as_deref()).await?;
            output::status(&format!("Trusted {ip}"), global.quiet);
        }
        TrustedCommand::Remove { ip } => {
            api.remove_trusted(&ip).await?;
            output::status(&format!("No longer trusted: {ip}"), global.quiet);
        }
    }
    Ok(())
}
