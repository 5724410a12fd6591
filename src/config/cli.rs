use crate::config::ConfigOverrides;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "concepts")]
#[command(about = "Mirror concept documents from S3 into a local SQLite cache")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, env = "CONCEPTS_CONFIG")]
    pub config: Option<String>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Download every object under the prefix into the download directory
    Fetch,
    /// Rebuild the database from the downloaded documents
    Build,
    /// Fetch, then build
    Sync,
    /// Report whether AWS credentials can be resolved
    CheckCredentials,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "concepts-api")]
#[command(about = "Read-only HTTP API over the concepts database")]
pub struct ServerArgs {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "CONCEPTS_CONFIG")]
    pub config: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// SQLite database file built by `concepts build`
    #[arg(long)]
    pub database: Option<String>,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}
