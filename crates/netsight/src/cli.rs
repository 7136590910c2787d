//! Clap derive structures for the `netsight` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// netsight -- live device inventory from the command line
#[derive(Debug, Parser)]
#[command(
    name = "netsight",
    version,
    about = "Inspect a live networked-device inventory from the command line",
    long_about = "Sweeps the device backend page by page, keeps the collection\n\
        current through create/update subscriptions, and renders it as\n\
        tables, detail views and summary reports.",
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
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "NETSIGHT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// GraphQL endpoint URL (overrides profile)
    #[arg(long, short = 'e', env = "NETSIGHT_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// WebSocket endpoint for live feeds (derived from --endpoint if unset)
    #[arg(long, env = "NETSIGHT_REALTIME_ENDPOINT", global = true)]
    pub realtime_endpoint: Option<String>,

    /// Backend API key
    #[arg(long, env = "NETSIGHT_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NETSIGHT_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "NETSIGHT_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "NETSIGHT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Devices requested per page
    #[arg(long, global = true)]
    pub page_size: Option<u32>,

    /// Stop the sweep after this many pages
    #[arg(long, global = true)]
    pub max_pages: Option<u32>,

    /// Wall-clock budget for the sweep (e.g. "30s", "2m")
    #[arg(long, global = true)]
    pub sweep_budget: Option<String>,

    /// What the sweep does after the last page
    #[arg(long, global = true)]
    pub sweep_mode: Option<SweepModeArg>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
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

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SweepModeArg {
    /// Append pages as they arrive
    AppendOnly,
    /// Append pages, then replace the collection with the full result
    AppendThenReplace,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List, inspect and watch devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Summary report over the whole inventory
    Report(ReportArgs),

    /// Render an in-app route (/, /devices, /devices/<mac>, /report)
    View(ViewArgs),

    /// Create a device on the backend
    Seed(SeedArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// Table of every device in the inventory
    #[command(alias = "ls")]
    List {
        /// Filter expression (all, iot, alarms, category=X, os=X, <attr>=X); repeatable
        #[arg(long, short = 'f')]
        filter: Vec<String>,

        /// Show at most this many rows
        #[arg(long, short = 'l')]
        limit: Option<usize>,

        /// Print a single attribute per device (dot-separated path)
        #[arg(long)]
        field: Option<String>,
    },

    /// Numbered MAC/FQDN list
    Compact,

    /// Every attribute of one device
    Get {
        /// Device MAC address
        mac: String,
    },

    /// Sweep, then print devices as the live feeds deliver them
    Watch {
        /// Stop after this many seconds (default: until Ctrl-C)
        #[arg(long, short = 'd')]
        duration: Option<u64>,

        /// Only print devices matching this filter
        #[arg(long, short = 'f')]
        filter: Option<String>,
    },
}

// ── Report / View / Seed ─────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Customer name shown in the report header (overrides profile)
    #[arg(long)]
    pub customer: Option<String>,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    /// Route path, e.g. /devices/AC:CC:8E:0A:69:26
    #[arg(default_value = "/")]
    pub path: String,
}

#[derive(Debug, Args)]
pub struct SeedArgs {
    /// JSON file with the device to create (built-in sample if omitted)
    #[arg(long, value_name = "PATH")]
    pub from_file: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a configuration value on the active profile
    Set {
        /// Config key (e.g. "endpoint", "page_size")
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },

    /// Store an API key in the system keyring
    SetKey {
        /// Profile name (defaults to active)
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
