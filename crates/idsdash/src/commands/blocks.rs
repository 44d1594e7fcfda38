//! Block journal and block/unblock actions.

use idsdash_core::Dashboard;
use idsdash_core::api::models::{BlockEntry, BlockOutcome, BlockRequest};
use tabled::Tabled;

use crate::cli::{BlocksArgs, BlocksCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct BlockRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Expires")]
    expires: String,
}

impl From<&BlockEntry> for BlockRow {
    fn from(b: &BlockEntry) -> Self {
        Self {
            time: output::or_dash(b.ts.as_deref()),
            ip: b.ip.clone(),
            action: b.action.to_string(),
            reason: output::or_dash(b.reason.as_deref()),
            expires: if b.is_temporary() {
                output::or_dash(b.expires_at.as_deref())
            } else {
                "never".into()
            },
        }
    }
}

fn outcome_detail(o: &BlockOutcome) -> String {
    output::detail_lines(&[
        ("Ok", Some(o.ok.to_string())),
        ("Firewall", o.firewall.as_ref().map(ToString::to_string)),
    ])
}

fn print_outcome(
    outcome: &BlockOutcome,
    done: &str,
    ip: &str,
    global: &GlobalOpts,
) {
    output::status(&format!("{done} {ip}"), global.quiet);
    let out = output::render_single(global.output, outcome, outcome_detail, |o| o.ok.to_string());
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: BlocksArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let api = dashboard.api();
    match args.command {
        BlocksCommand::List { limit } => {
            let entries = api.list_blocks(Some(limit)).await?;
            let out = output::render_list(global.output, &entries, |x| BlockRow::from(x), |b| b.ip.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BlocksCommand::Add {
            ip,
            reason,
            duration,
        } => {
            let request = BlockRequest {
                ip,
                reason,
                duration_minutes: duration,
            };
            let outcome = api.create_block(&request).await?;
            print_outcome(&outcome, "Blocked", &request.ip, global);
            Ok(())
        }

        BlocksCommand::Remove { ip, reason } => {
            let outcome = api.unblock_ip(&ip, reason.as_deref()).await?;
            print_outcome(&outcome, "Unblocked", &ip, global);
            Ok(())
        }

        BlocksCommand::LegacyBlock { ip, reason } => {
            let outcome = api.block_ip(&ip, reason.as_deref()).await?;
            print_outcome(&outcome, "Blocked", &ip, global);
            Ok(())
        }
    }
}
