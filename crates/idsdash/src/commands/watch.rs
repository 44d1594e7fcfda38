//! Live event feed.

use idsdash_core::{Dashboard, EventKind, PushEvent, StreamStatus, Subscription};
use strum::IntoEnumIterator;
use tokio::sync::mpsc;

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::{self, Palette, or_dash};

/// Requested kinds, or every kind when none are named.
fn parse_kinds(types: &[String]) -> Result<Vec<EventKind>, CliError> {
    if types.is_empty() {
        return Ok(EventKind::iter().collect());
    }
    let mut kinds = Vec::with_capacity(types.len());
    for raw in types {
        let kind: EventKind = raw.trim().parse().map_err(|_| CliError::Validation {
            field: "types".into(),
            reason: format!("unknown event type '{raw}' (expected alert, block or scan)"),
        })?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

/// One human-readable line per event.
fn event_line(event: &PushEvent, palette: Palette) -> String {
    match event {
        PushEvent::Alert(a) => format!(
            "{} alert {} {} {}",
            or_dash(a.ts.as_deref()),
            or_dash(a.src_ip.as_deref()),
            palette.severity(&or_dash(a.severity.as_deref())),
            or_dash(a.label.as_deref()),
        ),
        PushEvent::Block(b) => format!(
            "{} {} {} {}",
            or_dash(b.ts.as_deref()),
            b.action,
            b.ip,
            or_dash(b.reason.as_deref()),
        ),
        PushEvent::Scan(s) => format!("scan {} {}%", s.state, s.progress),
    }
}

fn render_event(event: &PushEvent, format: OutputFormat, palette: Palette) -> String {
    match format {
        OutputFormat::Table | OutputFormat::Plain => event_line(event, palette),
        // one document per line keeps the stream machine-readable
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(event),
        OutputFormat::Yaml => format!("---\n{}", output::render_yaml(event)),
    }
}

pub async fn handle(
    dashboard: &Dashboard,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let kinds = parse_kinds(&args.types)?;
    let palette = Palette::new(global.color);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subs = dashboard.on_events(&kinds, move |event| {
        let _ = tx.send(event);
    })?;
    let mut state = dashboard.connection_state();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut seen = 0usize;
    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),

            Some(event) = rx.recv() => {
                output::print_output(&render_event(&event, global.output, palette), false);
                seen += 1;
                if args.count.is_some_and(|n| seen >= n) {
                    break Ok(());
                }
            }

            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let status = *state.borrow_and_update();
                if let StreamStatus::Degraded { attempts } = status {
                    break Err(CliError::Stream {
                        message: format!("gave up after {attempts} reconnect attempts"),
                    });
                }
                output::status(&palette.dim(&format!("feed {status}")), global.quiet);
            }
        }
    };

    subs.iter().for_each(Subscription::unsubscribe);
    result
}
