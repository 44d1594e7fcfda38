//! Network scans with a progress bar.

use std::time::Duration;

use idsdash_core::Dashboard;
use idsdash_core::api::models::{ScanRequest, ScanState, ScanStatus};
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::{GlobalOpts, ScanArgs, ScanCommand};
use crate::error::CliError;
use crate::output::{self, Palette};

fn status_detail(s: &ScanStatus) -> String {
    let counts = match (s.done, s.targets) {
        (Some(done), Some(targets)) => Some(format!("{done}/{targets}")),
        _ => None,
    };
    output::detail_lines(&[
        ("State", Some(s.state.to_string())),
        ("Progress", Some(format!("{}%", s.progress))),
        ("Hosts", counts),
        ("Started", s.started.clone()),
        ("Finished", s.finished.clone()),
        ("Message", s.message.clone()),
    ])
}

fn print_status(status: &ScanStatus, global: &GlobalOpts) {
    let out = output::render_single(global.output, status, status_detail, |s| s.state.to_string());
    output::print_output(&out, global.quiet);
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:32.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn track(pb: &ProgressBar) -> impl FnMut(&ScanStatus) + '_ {
    move |status: &ScanStatus| {
        pb.set_position(u64::from(status.progress.min(100)));
        if let (Some(done), Some(targets)) = (status.done, status.targets) {
            pb.set_message(format!("{done}/{targets} hosts"));
        }
    }
}

/// Report the terminal state; anything but `done` is a failure.
fn finish(status: &ScanStatus, global: &GlobalOpts) -> Result<(), CliError> {
    print_status(status, global);
    if status.state == ScanState::Done {
        let palette = Palette::new(global.color);
        output::status(&palette.ok("Scan complete"), global.quiet);
        Ok(())
    } else {
        Err(CliError::ScanFailed {
            state: status.state.to_string(),
            message: status.message.clone(),
        })
    }
}

pub async fn handle(
    dashboard: &Dashboard,
    args: ScanArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ScanCommand::Start {
            cidr,
            ports,
            timeout_ms,
            wait,
        } => {
            let request = ScanRequest {
                cidr,
                ports,
                timeout_ms,
            };
            if !wait {
                let started = dashboard.api().start_scan(&request).await?;
                let out = output::render_single(
                    global.output,
                    &started,
                    |s| {
                        output::detail_lines(&[
                            ("Started", Some(s.ok.to_string())),
                            ("Targets", s.targets.map(|t| t.to_string())),
                            (
                                "Ports",
                                (!s.ports.is_empty()).then(|| {
                                    s.ports
                                        .iter()
                                        .map(ToString::to_string)
                                        .collect::<Vec<_>>()
                                        .join(",")
                                }),
                            ),
                        ])
                    },
                    |s| s.targets.unwrap_or_default().to_string(),
                );
                output::print_output(&out, global.quiet);
                return Ok(());
            }

            let pb = progress_bar(global.quiet);
            let result = dashboard.scan(&request, track(&pb)).await;
            pb.finish_and_clear();
            let (_, status) = result?;
            finish(&status, global)
        }

        ScanCommand::Status => {
            let status = dashboard.api().scan_status().await?;
            print_status(&status, global);
            Ok(())
        }

        ScanCommand::Wait => {
            let pb = progress_bar(global.quiet);
            let result = dashboard.wait_for_scan(track(&pb)).await;
            pb.finish_and_clear();
            finish(&result?, global)
        }
    }
}
