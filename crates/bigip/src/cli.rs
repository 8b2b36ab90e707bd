//! Clap derive structures for the `bigip` CLI.
//!
//! Defines the command tree, global flags, and shared value types. Kept
//! free of workspace crates so `build.rs` can include it for man pages.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// bigip -- declarative deployment and cluster sync for F5 BIG-IP fleets
#[derive(Debug, Parser)]
#[command(
    name = "bigip",
    version,
    about = "Deploy ATC declarations and converge F5 BIG-IP clusters",
    long_about = "Submits AS3, Declarative Onboarding and Telemetry Streaming\n\
        declarations, waits for their tasks to settle, and drives\n\
        config-sync until device groups report In Sync.",
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
    /// Inventory file (defaults to the platform config directory)
    #[arg(long, env = "BIGIP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Target device by inventory name (repeatable)
    #[arg(long = "device", short = 'd', global = true)]
    pub devices: Vec<String>,

    /// Target every device in a group (repeatable)
    #[arg(long = "group", short = 'g', global = true)]
    pub groups: Vec<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BIGIP_OUTPUT",
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

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "BIGIP_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides the inventory)
    #[arg(long, env = "BIGIP_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Devices processed concurrently (overrides the inventory)
    #[arg(long, global = true)]
    pub workers: Option<usize>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one line per device (scripting)
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
    /// Read, submit or delete an ATC declaration
    Deploy(DeployArgs),

    /// Run config-sync and wait for the device group to converge
    Sync(SyncArgs),

    /// Read cluster and system status
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Install or remove iApps LX packages
    #[command(alias = "pkg")]
    Package(PackageArgs),

    /// Upload, list and remove files on devices
    Files(FilesArgs),

    /// List devices in the inventory
    #[command(alias = "dev")]
    Devices,

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared poll arguments ────────────────────────────────────────────

/// Pacing for commands that wait on a device-side task.
#[derive(Debug, Args)]
pub struct PollArgs {
    /// Pause between status reads (e.g. "30s", "500ms")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub delay: Option<Duration>,

    /// Maximum number of status reads
    #[arg(long)]
    pub retries: Option<u32>,
}

// ── Deploy ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("source")
        .args(["declaration", "file", "url"])
        .multiple(false)
))]
pub struct DeployArgs {
    /// Inline JSON declaration
    #[arg(long)]
    pub declaration: Option<String>,

    /// Read the declaration from a JSON file
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Fetch the declaration from a URL
    #[arg(long)]
    pub url: Option<String>,

    /// ATC service: AS3, Device or Telemetry (inferred from the declaration's class)
    #[arg(long, short = 's')]
    pub service: Option<String>,

    /// HTTP method: GET, POST or DELETE
    #[arg(long, short = 'm', default_value = "GET")]
    pub method: String,

    /// AS3 tenant to target
    #[arg(long)]
    pub tenant: Option<String>,

    /// AS3 show mode: base, full or expanded
    #[arg(long, default_value = "base")]
    pub show: String,

    /// Ask AS3 for per-tenant optimistic lock hashes
    #[arg(long)]
    pub show_hash: bool,

    /// Validate and negotiate, but send nothing
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub poll: PollArgs,
}

// ── Sync ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Device group to synchronize
    #[arg(long = "device-group", short = 'G')]
    pub device_group: String,

    /// Propagation direction: to-group or from-group
    #[arg(long, default_value = "to-group")]
    pub direction: String,

    /// Make peers pull the full configuration
    #[arg(long)]
    pub force_full_load_push: bool,

    #[command(flatten)]
    pub poll: PollArgs,
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(subcommand)]
    pub command: StatusCommand,
}

#[derive(Debug, Subcommand)]
pub enum StatusCommand {
    /// Device-group sync status
    Sync,
    /// High-availability failover status
    Failover,
    /// System software version
    Version,
}

// ── Package ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PackageArgs {
    #[command(subcommand)]
    pub command: PackageCommand,
}

#[derive(Debug, Subcommand)]
pub enum PackageCommand {
    /// Upload (when missing) and install an RPM
    Install {
        /// Local RPM file
        package: PathBuf,

        /// Keep the uploaded RPM on the device afterwards
        #[arg(long)]
        retain_package_file: bool,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Uninstall a package by its RPM file name
    Uninstall {
        /// RPM file name, e.g. f5-appsvcs-3.22.1-1.noarch.rpm
        package: String,

        #[command(flatten)]
        poll: PollArgs,
    },
}

// ── Files ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FilesArgs {
    #[command(subcommand)]
    pub command: FilesCommand,
}

#[derive(Debug, Subcommand)]
pub enum FilesCommand {
    /// Upload a local file to the device's REST downloads directory
    Upload {
        /// Local file
        path: PathBuf,

        /// Name on the device (defaults to the local file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// List a path on the device
    Ls {
        /// Remote path
        path: String,
    },

    /// Remove a file on the device
    Rm {
        /// Remote path
        path: String,
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
    /// Print the resolved config file path
    Path,
    /// Display the loaded configuration (passwords masked)
    Show,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
