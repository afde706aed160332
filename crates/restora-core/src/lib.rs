//! Restora Core - session state and orchestration for photo restoration.
//!
//! This crate provides:
//! - The pure session state machine
//! - The session controller that drives uploads, restorations and downloads
//! - Local file reading and download naming
//! - Configuration management
//! - Error handling
//!
//! # Example
//!
//! ```rust,no_run
//! use restora_core::{RestoraConfig, SelectedFile, SessionController};
//! use std::sync::Arc;
//!
//! # async fn run() -> restora_core::Result<()> {
//! let config = RestoraConfig::discover_and_load();
//! let controller = SessionController::new(Arc::new(config.build_model()));
//!
//! controller.upload(SelectedFile::from_path("grandma.jpg")).await?;
//! controller.request_restoration().await?;
//! controller.download(&config.output_dir()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod download;
pub mod error;
pub mod file_reader;
pub mod state;

pub use config::{ConfigError, RestoraConfig};
pub use controller::{RESTORATION_INSTRUCTION, RestorationTicket, SessionController};
pub use download::download_file_name;
pub use error::{Result, SessionError, messages};
pub use file_reader::{FileReadError, FileReader, FileSource, LocalFileReader, SelectedFile};
pub use state::{Event, Phase, SessionState};
