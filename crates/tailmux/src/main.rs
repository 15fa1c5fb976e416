//! Tailmux - headless multi-source log tailer over SSH
//!
//! # Usage
//!
//! ```bash
//! # Show the configured sources
//! tailmux --config tailmux.toml list
//!
//! # Stream one source to stdout (engine logs go to stderr)
//! tailmux --config tailmux.toml tail api-prod
//!
//! # Stream every configured source
//! tailmux --config tailmux.toml tail
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tailmux_config::{Config, LogFormat};

/// Headless multi-source log tailer over SSH
#[derive(Parser, Debug)]
#[command(name = "tailmux")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file
    #[arg(short, long, default_value = "tailmux.toml", global = true)]
    config: std::path::PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the configured sources
    List,

    /// Follow sources and stream their bytes to stdout
    Tail(cmd::tail::TailArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    init_logging(&config, cli.log_level.as_deref())?;

    match cli.command {
        Some(Command::List) => cmd::list::run(&config),
        Some(Command::Tail(args)) => cmd::tail::run(config, args).await,
        // No subcommand: tail everything
        None => cmd::tail::run(config, cmd::tail::TailArgs::default()).await,
    }
}

/// Initialize the tracing subscriber
///
/// Everything goes to stderr; stdout is reserved for the tailed bytes.
fn init_logging(config: &Config, override_level: Option<&str>) -> Result<()> {
    let directive = override_level.unwrap_or_else(|| config.log.level.as_str());
    let filter = EnvFilter::try_new(directive)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    match config.log.format {
        LogFormat::Console => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    }

    Ok(())
}
