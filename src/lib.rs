// dcmsend - batch DICOM converter and sender
//
// This is the library crate containing the DICOM codecs, the conversion and
// transfer services, and configuration. The binary crate (main.rs) provides
// the command-line entry point.

pub mod cli;
pub mod config;
pub mod dicom;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types for convenience
pub use config::{ConfigManager, Settings};
pub use models::{Artifact, BatchTally, CompressionScheme, PipelineResult, TransferConfig};
pub use services::{BatchRunner, FilePipeline};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
