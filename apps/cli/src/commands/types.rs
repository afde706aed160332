//! Command type definitions shared between main.rs and tests.

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration file locations
    Path,
}
