//! Event log query and export.

use idsdash_core::Dashboard;
use idsdash_core::api::LogFilter;
use idsdash_core::api::models::{ExportFormat, LogEvent};
use tabled::Tabled;

use crate::cli::{ExportFormatArg, GlobalOpts, LogFilterArgs, LogsArgs, LogsCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Type")]
    event_type: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Label")]
    label: String,
}

impl From<&LogEvent> for LogRow {
    fn from(e: &LogEvent) -> Self {
        Self {
            time: output::or_dash(e.ts.as_deref()),
            ip: output::or_dash(e.ip.as_deref()),
            event_type: output::or_dash(e.event_type.as_deref()),
            severity: output::or_dash(e.severity.as_deref()),
            label: output::or_dash(e.label.as_deref()),
        }
    }
}

impl From<LogFilterArgs> for LogFilter {
    fn from(args: LogFilterArgs) -> Self {
        Self {
            ip: args.ip,
            severity: args.severity,
            event_type: args.event_type,
            from: args.from,
            to: args.to,
            limit: args.limit,
        }
    }
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Csv => Self::Csv,
            ExportFormatArg::Json => Self::Json,
        }
    }
}

pub async fn handle(
    dashboard: &Dashboard,
    args: LogsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let api = dashboard.api();
    match args.command {
        LogsCommand::Query(filter) => {
            let events = api.query_logs(&filter.into()).await?;
            let out = output::render_list(global.output, &events, |x| LogRow::from(x), |e| e.id.clone());
            output::print_output(&out, global.quiet);
        }
        LogsCommand::Export {
            filter,
            format,
            dir,
        } => {
            let path = api
                .export_logs(&filter.into(), format.into(), &dir)
                .await?;
            output::status("Export saved", global.quiet);
            output::print_output(&path.display().to_string(), global.quiet);
        }
    }
    Ok(())
}
