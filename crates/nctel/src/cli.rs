//! Clap derive structures for the `nctel` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nctel -- NETCONF telemetry collector tools
#[derive(Debug, Parser)]
#[command(
    name = "nctel",
    version,
    about = "Validate collector configs and decode NETCONF telemetry payloads",
    long_about = "Tools for the nctel NETCONF telemetry collector.\n\n\
        Validates collector configuration files and decodes captured\n\
        YANG-push / get payloads into time-series records offline.",
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
    /// Config file (defaults to the platform config path)
    #[arg(long, short = 'c', env = "NCTEL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load and validate the collector configuration
    Check(CheckArgs),

    /// Decode a captured XML payload into records (JSON lines)
    Decode(DecodeArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Also print the effective configuration (secrets redacted)
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Payload file, or "-" for stdin
    pub file: PathBuf,

    /// Measurement selector (repeatable)
    #[arg(long, short = 'm', required = true)]
    pub measurement: Vec<String>,

    /// Tag selector (repeatable)
    #[arg(long, short = 't')]
    pub tag: Vec<String>,

    /// Value of the `source` tag
    #[arg(long, default_value = "localhost")]
    pub source: String,

    /// Record timestamp, RFC 3339 (defaults to now)
    #[arg(long)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
