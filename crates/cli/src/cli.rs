//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// xpcc dispatch - inter-component message dispatcher tools
#[derive(Parser, Debug)]
#[command(
    name = "xpcc-dispatch",
    author,
    version,
    about = "Inspect node configurations and exercise the xpcc message dispatcher",
    long_about = "Tools around the xpcc inter-component message dispatcher.\n\n\
                  Validates node configurations and runs a two-node simulation \n\
                  over an in-memory link with optional packet loss."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "XPCC_DISPATCH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "XPCC_DISPATCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a request/response simulation between this node and its peers
    Simulate(SimulateArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "node.toml",
        env = "XPCC_DISPATCH_CONFIG"
    )]
    pub config: PathBuf,

    /// Number of callback requests to issue
    #[arg(long, default_value = "10", env = "XPCC_DISPATCH_REQUESTS")]
    pub requests: u32,

    /// Lose every N-th packet on the link (0 = lossless, otherwise N >= 2)
    #[arg(long, default_value = "0", env = "XPCC_DISPATCH_LOSS", value_parser = parse_loss)]
    pub loss: u64,

    /// Interval between update() calls in milliseconds
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Simulation timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "30", env = "XPCC_DISPATCH_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without simulating
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "XPCC_DISPATCH_METRICS_PORT")]
    pub metrics_port: u16,
}

/// `--loss 1` 会丢掉所有包，不接受
fn parse_loss(value: &str) -> Result<u64, String> {
    let every: u64 = value
        .parse()
        .map_err(|e| format!("invalid loss interval '{value}': {e}"))?;
    match every {
        1 => Err("loss interval must be 0 (lossless) or at least 2".to_string()),
        n => Ok(n),
    }
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "node.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "node.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Also list remote peers
    #[arg(long)]
    pub peers: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
