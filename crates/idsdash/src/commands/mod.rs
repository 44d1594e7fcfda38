//! Command dispatch: bridges CLI args -> dashboard calls -> output formatting.

pub mod alerts;
pub mod blocks;
pub mod config_cmd;
pub mod devices;
pub mod logs;
pub mod ops;
pub mod scan;
pub mod session;
pub mod settings;
pub mod trusted;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Context;
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let dashboard = &ctx.dashboard;
    match cmd {
        Command::Login(args) => session::login(ctx, args, global).await,
        Command::Logout => session::logout(dashboard, global).await,
        Command::Whoami => session::whoami(dashboard, global).await,
        Command::Alerts(args) => alerts::handle(dashboard, args, global).await,
        Command::Blocks(args) => blocks::handle(dashboard, args, global).await,
        Command::Trusted(args) => trusted::handle(dashboard, args, global).await,
        Command::Devices(args) => devices::handle(dashboard, args, global).await,
        Command::Settings(args) => settings::handle(dashboard, args, global).await,
        Command::Logs(args) => logs::handle(dashboard, args, global).await,
        Command::Scan(args) => scan::handle(dashboard, args, global).await,
        Command::Ops(args) => ops::handle(dashboard, args, global).await,
        Command::Watch(args) => watch::handle(dashboard, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
