//! Clap derive structures for the `junghome` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// junghome -- drive a JUNG HOME gateway from the command line
#[derive(Debug, Parser)]
#[command(
    name = "junghome",
    version,
    about = "Inspect and control JUNG HOME gateway devices",
    long_about = "Reads the device catalog of a JUNG HOME gateway, follows live\n\
        state changes over its socket, and switches lights, sockets, and covers.",
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
    /// Gateway profile to use
    #[arg(long, short = 'p', env = "JUNGHOME_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Gateway host or URL (overrides profile)
    #[arg(long, short = 'H', env = "JUNGHOME_HOST", global = true)]
    pub host: Option<String>,

    /// Gateway token (overrides profile)
    #[arg(long, env = "JUNGHOME_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "JUNGHOME_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', env = "JUNGHOME_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "JUNGHOME_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

impl GlobalOpts {
    pub fn format(&self) -> OutputFormat {
        self.output.clone().unwrap_or(OutputFormat::Table)
    }
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and inspect devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Follow live device changes until interrupted
    Watch(WatchArgs),

    /// Show gateway (hub) information
    Hub,

    /// Check that the gateway answers with the configured token
    Test,

    /// Turn a light or socket on or off
    Switch(SwitchArgs),

    /// Set a dimmable light's brightness
    Brightness(BrightnessArgs),

    /// Move a cover
    Cover(CoverArgs),

    /// Manage configuration profiles
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
    /// List devices
    #[command(alias = "ls")]
    List(DevicesListArgs),

    /// Show one device with its datapoints
    Get {
        /// Device id
        device: String,
    },

    /// Read one datapoint straight from the gateway
    Read {
        /// Device id
        device: String,
        /// Datapoint id
        datapoint: String,
    },
}

#[derive(Debug, Args)]
pub struct DevicesListArgs {
    /// Only devices of this category (cover, light, sensor, switch)
    #[arg(long, short = 'c')]
    pub category: Option<String>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit after this many table events
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

// ── Control ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SwitchState {
    On,
    Off,
}

#[derive(Debug, Args)]
pub struct SwitchArgs {
    /// Device id
    pub device: String,
    /// Desired state
    pub state: SwitchState,
}

#[derive(Debug, Args)]
pub struct BrightnessArgs {
    /// Device id
    pub device: String,
    /// Brightness, 0-255 (or 0-100 with --percent)
    pub value: u8,
    /// Interpret the value as a percentage
    #[arg(long)]
    pub percent: bool,
}

#[derive(Debug, Args)]
pub struct CoverArgs {
    /// Device id
    pub device: String,
    #[command(subcommand)]
    pub action: CoverAction,
}

#[derive(Debug, Subcommand)]
pub enum CoverAction {
    /// Fully open
    Open,
    /// Fully close
    Close,
    /// Move to a position (0 = closed, 100 = open)
    Position {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        value: u8,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the configuration with tokens masked
    Show,
    /// Print the configuration file location
    Path,
    /// List profile names
    Profiles,
    /// Create or replace a profile
    Init(ConfigInitArgs),
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// Gateway host or URL
    #[arg(long = "gateway")]
    pub gateway: String,

    /// Read the token from this environment variable at run time
    #[arg(long, conflicts_with = "plain_token")]
    pub token_env: Option<String>,

    /// Store this token in the config file (plaintext)
    #[arg(long = "plain-token")]
    pub plain_token: Option<String>,

    /// Path to the gateway's CA certificate
    #[arg(long)]
    pub ca_cert: Option<std::path::PathBuf>,

    /// Make this profile the default
    #[arg(long)]
    pub default: bool,

    /// Replace an existing profile
    #[arg(long)]
    pub force: bool,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
