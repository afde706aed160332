//! Restora CLI - Command-line interface for AI photo restoration
//!
//! This CLI uploads a photo to a hosted image model with a fixed restoration
//! instruction and saves the restored result next to it.

mod commands;
mod config;
mod render;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{ConfigCommand, config_cmd, restore, session};

/// Restora CLI - Restore and colorize old photos
///
/// Restora sends a photo to a hosted generative image model together with a
/// fixed restoration instruction, then saves the returned image.
#[derive(Parser, Debug)]
#[command(
    name = "restora",
    author,
    version,
    about = "Restora - AI photo restoration and colorization",
    long_about = "Restora uploads a photo to a hosted generative image model with a fixed restoration instruction.\nThe restored image is saved as <name>-restored.<ext>."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Configuration file (skips ~/.restora/config.toml and ./.restorarc)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Model to use (overrides configuration)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// API key (overrides configuration and environment)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// API root of the image service
    #[arg(long, global = true, hide = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Restore a single photo
    ///
    /// Uploads the photo, requests a restoration and saves the result.
    Restore {
        /// Photo to restore (PNG, JPEG or WEBP)
        input: PathBuf,

        /// Directory to save the restored image in
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive restoration session
    ///
    /// Reads intents from stdin: upload <path>, restore, download [dir],
    /// reset, status, wait, help, quit.
    Session,

    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Configuration is loaded under the command-line level so that problems
    // with the config files themselves are still reported.
    let startup_level = parse_level(args.log_level.as_deref());
    let cli_config = tracing::subscriber::with_default(build_subscriber(startup_level), || {
        config::load_config(
            args.config.as_deref(),
            config::Overrides {
                model: args.model,
                api_key: args.api_key,
                base_url: args.base_url,
            },
        )
    })?;

    // Initialize tracing
    let level = parse_level(args.log_level.as_deref().or(cli_config.log_level.as_deref()));
    tracing::subscriber::set_global_default(build_subscriber(level))?;

    match args.command {
        Command::Restore { input, output_dir, json } => {
            let output_dir = output_dir.unwrap_or_else(|| cli_config.output_dir());
            restore::execute(&cli_config, &input, &output_dir, json).await
        }
        Command::Session => session::execute(&cli_config).await,
        Command::Config(command) => config_cmd::execute(&cli_config, args.config.as_deref(), command),
    }
}

fn parse_level(level: Option<&str>) -> Level {
    match level {
        Some("trace") => Level::TRACE,
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("error") => Level::ERROR,
        _ => Level::WARN,
    }
}

fn build_subscriber(level: Level) -> impl tracing::Subscriber + Send + Sync + 'static {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish()
}
