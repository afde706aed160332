//! Config command implementation.

use colored::Colorize;
use restora_core::RestoraConfig;
use serde_json::json;
use std::path::Path;

use super::ConfigCommand;

/// Execute a config subcommand.
pub fn execute(
    config: &RestoraConfig,
    explicit: Option<&Path>,
    command: ConfigCommand,
) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Show { json } => show(config, json),
        ConfigCommand::Path => {
            path(explicit);
            Ok(())
        }
    }
}

fn show(config: &RestoraConfig, json_output: bool) -> anyhow::Result<()> {
    let api_key = config.masked_api_key();

    if json_output {
        let value = json!({
            "api_key": api_key,
            "model": config.model_id(),
            "base_url": config.base_url(),
            "output_dir": config.output_dir().display().to_string(),
            "log_level": config.log_level,
            "timeout_secs": config.timeout_secs,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Restora Configuration".bold().cyan());
    println!();
    match api_key {
        Some(key) => println!("  API key: {}", key.green()),
        None => {
            println!("  API key: {}", "✗ Not configured".red());
            println!("  {}", "Set GEMINI_API_KEY or api_key in ~/.restora/config.toml".dimmed());
        }
    }
    println!("  Model: {}", config.model_id());
    println!("  Base URL: {}", config.base_url().dimmed());
    println!("  Output: {}", config.output_dir().display());
    if let Some(secs) = config.timeout_secs {
        println!("  Timeout: {}s", secs);
    }
    if let Some(ref level) = config.log_level {
        println!("  Log level: {}", level);
    }
    Ok(())
}

fn path(explicit: Option<&Path>) {
    if let Some(path) = explicit {
        println!("{}", path.display());
        return;
    }
    println!("{}", RestoraConfig::default_global_path().display());
    println!("{}", RestoraConfig::default_local_path().display());
}
