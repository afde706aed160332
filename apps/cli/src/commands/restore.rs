//! Restore command implementation.
//!
//! Runs one full session: upload, restoration, download.

use anyhow::anyhow;
use colored::Colorize;
use restora_core::{RestoraConfig, SelectedFile, SessionController, SessionError};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const NOTHING_SAVED: &str = "The restoration finished without an image to save.";

/// Execute the restore command.
pub async fn execute(
    config: &RestoraConfig,
    input: &Path,
    output_dir: &Path,
    json_output: bool,
) -> anyhow::Result<()> {
    let controller = SessionController::new(Arc::new(config.build_model()));

    if !json_output {
        println!("{}", "Restora - Photo Restoration".bold().cyan());
        println!();
        println!("  Input: {}", input.display().to_string().dimmed());
        println!("  Model: {}", config.model_id().dimmed());
        println!();
        println!("  {}", "Restoring your memories...".yellow());
    }

    let result = run(&controller, input, output_dir).await;

    if json_output {
        let value = match &result {
            Ok(Some(path)) => json!({
                "status": "restored",
                "file": input.display().to_string(),
                "output": path.display().to_string(),
                "error": null,
            }),
            Ok(None) => json!({
                "status": controller.phase().to_string(),
                "file": input.display().to_string(),
                "output": null,
                "error": NOTHING_SAVED,
            }),
            Err(e) => json!({
                "status": controller.phase().to_string(),
                "file": input.display().to_string(),
                "output": null,
                "error": e.user_message(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
    }

    // Failures are reported once, by main, on stderr.
    match result {
        Ok(Some(path)) => {
            if !json_output {
                println!("  {} Saved {}", "✓".green(), path.display().to_string().green());
            }
            Ok(())
        }
        Ok(None) => Err(anyhow!(NOTHING_SAVED)),
        Err(e) => Err(anyhow!(e.user_message())),
    }
}

async fn run(
    controller: &SessionController,
    input: &Path,
    output_dir: &Path,
) -> Result<Option<PathBuf>, SessionError> {
    controller.upload(SelectedFile::from_path(input)).await?;
    controller.request_restoration().await?;
    controller.download(output_dir).await
}
