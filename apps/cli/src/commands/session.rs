//! Interactive session command.
//!
//! Reads one intent per line from stdin and drives a single restoration session.

use colored::Colorize;
use restora_core::{RestoraConfig, SelectedFile, SessionController, SessionError};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::render::{render_banner, render_state};

const HELP: &str = "\
  upload <path>    Select a photo (clears the session)
  restore          Restore the uploaded photo
  download [dir]   Save the restored photo
  reset            Start over
  status           Show the session
  wait             Wait for the running restoration
  help             Show this help
  quit             Exit";

/// A user intent read from one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Upload(PathBuf),
    Restore,
    Download(Option<PathBuf>),
    Reset,
    Status,
    Wait,
    Help,
    Quit,
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match (command.to_ascii_lowercase().as_str(), rest) {
            ("upload", "") => Err("Usage: upload <path>".to_string()),
            ("upload", path) => Ok(Self::Upload(PathBuf::from(path))),
            ("restore", "") => Ok(Self::Restore),
            ("download", "") => Ok(Self::Download(None)),
            ("download", dir) => Ok(Self::Download(Some(PathBuf::from(dir)))),
            ("reset", "") => Ok(Self::Reset),
            ("status", "") => Ok(Self::Status),
            ("wait", "") => Ok(Self::Wait),
            ("help" | "?", "") => Ok(Self::Help),
            ("quit" | "exit", "") => Ok(Self::Quit),
            _ => Err(format!("Unknown command: {} (type 'help')", line)),
        }
    }
}

/// Execute the session command.
pub async fn execute(config: &RestoraConfig) -> anyhow::Result<()> {
    let controller = Arc::new(SessionController::new(Arc::new(config.build_model())));
    let interactive = std::io::stdin().is_terminal();
    let mut in_flight: Option<JoinHandle<()>> = None;

    if interactive {
        println!("{}", "Restora Session".bold().cyan());
        println!("{}", "Type 'help' for commands.".dimmed());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            print!("> ");
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            settle(&mut in_flight).await;
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let intent = match line.parse::<Intent>() {
            Ok(intent) => intent,
            Err(message) => {
                println!("{}", render_banner(&message));
                continue;
            }
        };
        debug!(?intent, "Handling intent");

        match intent {
            Intent::Upload(path) => {
                settle_if_finished(&mut in_flight);
                // Failures are recorded in the session state.
                let _ = controller.upload(SelectedFile::from_path(path)).await;
            }
            Intent::Restore => {
                settle_if_finished(&mut in_flight);
                match spawn_restoration(&controller) {
                    Ok(handle) => in_flight = Some(handle),
                    Err(e) => report(&e),
                }
            }
            Intent::Download(dir) => {
                let dir = dir.unwrap_or_else(|| config.output_dir());
                match controller.download(&dir).await {
                    Ok(Some(path)) => {
                        println!("  {} Saved {}", "✓".green(), path.display().to_string().green());
                    }
                    Ok(None) => println!("  {}", "No restored image to download yet.".dimmed()),
                    Err(e) => report(&e),
                }
                continue;
            }
            Intent::Reset => controller.reset(),
            Intent::Status => {}
            Intent::Wait => settle(&mut in_flight).await,
            Intent::Help => {
                println!("{}", HELP);
                continue;
            }
            Intent::Quit => {
                if let Some(handle) = in_flight.take() {
                    handle.abort();
                }
                break;
            }
        }

        println!("{}", render_state(&controller.snapshot()));
    }

    Ok(())
}

/// Starts a restoration in the background.
///
/// Precondition failures and `Busy` are returned before anything is spawned.
fn spawn_restoration(controller: &Arc<SessionController>) -> restora_core::Result<JoinHandle<()>> {
    let ticket = controller.begin_restoration()?;
    let controller = Arc::clone(controller);

    Ok(tokio::spawn(async move {
        let result = controller.service().restore(ticket.request()).await;
        match controller.complete_restoration(&ticket, result) {
            Ok(()) => println!("  {} Restoration complete", "✓".green()),
            Err(SessionError::Superseded) => {
                debug!(generation = ticket.generation(), "Discarded stale restoration");
            }
            Err(e) => println!("{}", render_banner(&e.user_message())),
        }
    }))
}

async fn settle(in_flight: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = in_flight.take() {
        if let Err(e) = handle.await {
            debug!(error = %e, "Restoration task ended abnormally");
        }
    }
}

fn settle_if_finished(in_flight: &mut Option<JoinHandle<()>>) {
    if in_flight.as_ref().is_some_and(JoinHandle::is_finished) {
        in_flight.take();
    }
}

/// Prints errors that are not kept in the session state.
fn report(error: &SessionError) {
    match error {
        SessionError::Busy | SessionError::Superseded | SessionError::Download { .. } => {
            println!("{}", render_banner(&error.user_message()));
        }
        _ => {}
    }
}
