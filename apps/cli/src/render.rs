//! Terminal rendering of the session state.

use colored::Colorize;
use restora_core::{Phase, SessionState};

/// Renders the session as a short status block.
pub fn render_state(state: &SessionState) -> String {
    let mut lines = Vec::new();

    let phase = state.phase();
    let phase_label = match phase {
        Phase::Empty => phase.to_string().dimmed(),
        Phase::Ready => phase.to_string().cyan(),
        Phase::Restoring => phase.to_string().yellow(),
        Phase::Restored => phase.to_string().green(),
        Phase::Failed => phase.to_string().red(),
    };
    lines.push(format!("  Status: {}", phase_label));

    match (&state.original_image, &state.file_name) {
        (Some(image), Some(name)) => lines.push(format!(
            "  Original: {} {}",
            name,
            format!("({}, {} bytes)", image.mime_type, image.byte_len()).dimmed()
        )),
        (Some(image), None) => {
            lines.push(format!("  Original: {}", format!("{} bytes", image.byte_len()).dimmed()));
        }
        _ => lines.push(format!("  Original: {}", "none".dimmed())),
    }

    if state.is_loading {
        lines.push(format!("  Restored: {}", "Restoring your memories...".yellow()));
    } else if let Some(ref image) = state.restored_image {
        lines.push(format!(
            "  Restored: {}",
            format!("{} ({} bytes)", image.mime_type, image.byte_len()).green()
        ));
    } else {
        lines.push(format!("  Restored: {}", "none".dimmed()));
    }

    if let Some(ref error) = state.error {
        lines.push(render_banner(error));
    }

    lines.join("\n")
}

/// Renders an error banner.
pub fn render_banner(message: &str) -> String {
    format!("  {} {}", "✗".red(), message.red())
}
