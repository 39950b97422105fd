//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Queue Bridge - forwards Redis pub/sub messages into Redis lists
#[derive(Parser, Debug)]
#[command(
    name = "queue-bridge",
    author,
    version,
    about = "Redis pub/sub to queue forwarding bridge",
    long_about = "Subscribes to Redis pub/sub channels and forwards every message to the \n\
                  queues (Redis lists) mapped to its channel.\n\n\
                  One channel may fan out to several queues; a failing queue never \n\
                  blocks the others. Stops gracefully on SIGINT/SIGTERM."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "QUEUE_BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "QUEUE_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge until interrupted
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (YAML, TOML or JSON)
    #[arg(short, long, default_value = "config.yaml", env = "CONFIG_PATH")]
    pub config: PathBuf,

    /// Override Redis host from configuration
    #[arg(long, env = "REDIS_HOST")]
    pub host: Option<String>,

    /// Override Redis port from configuration
    #[arg(long, env = "REDIS_PORT")]
    pub port: Option<u16>,

    /// Override Redis database index from configuration
    #[arg(long, env = "REDIS_DB")]
    pub db: Option<i64>,

    /// Validate configuration and exit without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "QUEUE_BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.yaml", env = "CONFIG_PATH")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml", env = "CONFIG_PATH")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
