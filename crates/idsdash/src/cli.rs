//! Clap derive structures for the `idsdash` CLI.
//!
//! Defines the command tree, global flags, and shared argument types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// idsdash -- command-line client for the IDS dashboard backend
#[derive(Debug, Parser)]
#[command(
    name = "idsdash",
    version,
    about = "Operate an IDS dashboard backend from the command line",
    long_about = "Query alerts, manage blocks and trusted addresses, run network scans \
        and follow the live event feed of an IDS dashboard backend.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend origin (overrides the saved base and config.toml)
    #[arg(long, short = 'b', global = true)]
    pub api_base: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "IDSDASH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (0 disables it)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and keep the session token
    Login(LoginArgs),

    /// End the session and forget the token
    Logout,

    /// Show who the backend thinks you are
    Whoami,

    /// List recent alerts
    #[command(alias = "a")]
    Alerts(AlertsArgs),

    /// Block, unblock and review the block journal
    Blocks(BlocksArgs),

    /// Manage addresses that are never blocked
    Trusted(TrustedArgs),

    /// Discovered network devices
    #[command(alias = "dev")]
    Devices(DevicesArgs),

    /// Read and change backend settings
    Settings(SettingsArgs),

    /// Query and export the event log
    Logs(LogsArgs),

    /// Run and track network scans
    Scan(ScanArgs),

    /// Health, retention, backup and reset
    Ops(OpsArgs),

    /// Follow the live event feed
    Watch(WatchArgs),

    /// Manage CLI configuration and saved preferences
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SESSION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Username (defaults to `username` from config.toml)
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Password (prefer IDSDASH_PASSWORD or the keyring)
    #[arg(long)]
    pub password: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ALERTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AlertsArgs {
    /// Max results
    #[arg(long, short = 'l', default_value = "50")]
    pub limit: u32,

    /// Continue from a cursor returned by a previous page
    #[arg(long)]
    pub cursor: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  BLOCKS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct BlocksArgs {
    #[command(subcommand)]
    pub command: BlocksCommand,
}

#[derive(Debug, Subcommand)]
pub enum BlocksCommand {
    /// Show the block/unblock journal, newest first
    #[command(alias = "ls")]
    List {
        /// Max results
        #[arg(long, short = 'l', default_value = "100")]
        limit: u32,
    },

    /// Block an address, optionally for a limited time
    Add {
        /// IPv4 or IPv6 address
        ip: String,

        /// Reason recorded in the journal
        #[arg(long, short = 'r')]
        reason: Option<String>,

        /// Lift the block automatically after this many minutes
        #[arg(long, short = 'd')]
        duration: Option<u32>,
    },

    /// Unblock an address
    #[command(alias = "rm")]
    Remove {
        ip: String,

        #[arg(long, short = 'r')]
        reason: Option<String>,
    },

    /// Block through the older single-address endpoint
    LegacyBlock {
        ip: String,

        #[arg(long, short = 'r')]
        reason: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TRUSTED
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TrustedArgs {
    #[command(subcommand)]
    pub command: TrustedCommand,
}

#[derive(Debug, Subcommand)]
pub enum TrustedCommand {
    /// List trusted addresses
    #[command(alias = "ls")]
    List,

    /// Trust an address (refused while it is blocked)
    Add {
        ip: String,

        /// Free-form note
        #[arg(long, short = 'n')]
        note: Option<String>,
    },

    /// Stop trusting an address
    #[command(alias = "rm")]
    Remove { ip: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List discovered devices
    #[command(alias = "ls")]
    List,

    /// Give a device a friendly name
    Rename {
        /// Device address
        ip: String,

        /// New name
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SETTINGS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show all settings, or a single `Section.Key`
    Get { key: Option<String> },

    /// Update one or more settings
    Set {
        /// `Section.Key=value` pairs
        #[arg(required = true, value_name = "KEY=VALUE")]
        pairs: Vec<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LOGS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LogsArgs {
    #[command(subcommand)]
    pub command: LogsCommand,
}

/// Shared filters for log queries and exports. Blank values are not sent.
#[derive(Debug, Args)]
pub struct LogFilterArgs {
    /// Source address
    #[arg(long)]
    pub ip: Option<String>,

    /// Severity (low, medium, high)
    #[arg(long, short = 's')]
    pub severity: Option<String>,

    /// Event type
    #[arg(long = "type", short = 't')]
    pub event_type: Option<String>,

    /// Start of the time window (ISO 8601)
    #[arg(long)]
    pub from: Option<String>,

    /// End of the time window (ISO 8601)
    #[arg(long)]
    pub to: Option<String>,

    /// Max results
    #[arg(long, short = 'l')]
    pub limit: Option<u32>,
}

#[derive(Debug, Subcommand)]
pub enum LogsCommand {
    /// Query the event log
    Query(LogFilterArgs),

    /// Download the filtered log to a file
    Export {
        #[command(flatten)]
        filter: LogFilterArgs,

        /// File format
        #[arg(long, short = 'f', default_value = "csv")]
        format: ExportFormatArg,

        /// Directory to save into
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormatArg {
    Csv,
    Json,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SCAN
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(subcommand)]
    pub command: ScanCommand,
}

#[derive(Debug, Subcommand)]
pub enum ScanCommand {
    /// Start a network scan
    Start {
        /// Target range (defaults to the backend's configured network)
        #[arg(long)]
        cidr: Option<String>,

        /// Ports to probe (comma-separated)
        #[arg(long, value_delimiter = ',')]
        ports: Option<Vec<u16>>,

        /// Per-host probe timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u32>,

        /// Follow progress until the scan finishes
        #[arg(long, short = 'w')]
        wait: bool,
    },

    /// Show the current scan state
    Status,

    /// Follow the running scan until it finishes
    Wait,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OPS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct OpsArgs {
    #[command(subcommand)]
    pub command: OpsCommand,
}

#[derive(Debug, Subcommand)]
pub enum OpsCommand {
    /// Backend liveness probe
    Health,

    /// Apply the retention policy now
    Retention,

    /// Download a database backup
    Backup {
        /// Directory to save into
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Wipe collected data (irreversible)
    Reset,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Event types to follow (comma-separated: alert, block, scan)
    #[arg(long, short = 't', value_delimiter = ',')]
    pub types: Vec<String>,

    /// Exit after this many events
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration
    Show,

    /// Print the config and state file locations
    Path,

    /// Save an API base that overrides config.toml
    SetBase { url: String },

    /// Forget the saved API base
    ClearBase,

    /// Show or change the UI theme preference
    Theme { theme: Option<ThemeArg> },

    /// Store a login password in the system keyring
    SetPassword {
        /// Account the password belongs to
        #[arg(long, short = 'u')]
        username: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThemeArg {
    Dark,
    Light,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
