//! Moving quotes in and out of files.
//!
//! - [`EntryImporter`] reads line items from CSV or JSON.
//! - [`export`] writes them back out as CSV or a JSON snapshot.
//! - [`AppConfig`] is the TOML configuration shared by the CLI.

mod config;
pub mod export;
mod import;

pub use config::{AppConfig, ConfigError};
pub use import::{EntryImportError, EntryImporter, FileFormat};
