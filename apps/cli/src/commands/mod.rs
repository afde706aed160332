//! Command implementations for the Restora CLI.

pub mod config_cmd;
pub mod restore;
pub mod session;
pub mod types;

pub use types::ConfigCommand;
