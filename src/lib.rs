//! # ClipKeep
//!
//! Desktop clipboard history manager for macOS and Linux.
//!
//! ClipKeep watches the system clipboard, persists text and image entries
//! to a local SQLite database with a bounded retention policy, and lets a
//! user browse, search, favorite, and re-copy past entries from the
//! terminal.

pub mod cli;
pub mod clipboard;
pub mod config;
#[cfg(unix)]
pub mod daemon;
pub mod history;
pub mod monitor;

pub use config::Config;

/// Result type alias for ClipKeep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ClipKeep operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Clipboard operation error
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] clipboard::ClipboardError),

    /// History storage error
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default maximum size for captured text entries (1MB)
pub const DEFAULT_MAX_TEXT_BYTES: usize = 1024 * 1024;
