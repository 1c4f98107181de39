//! Clipboard abstraction layer
//!
//! This module provides a platform-agnostic interface for clipboard
//! operations, an `arboard`-backed system implementation, and the one-shot
//! echo-suppression gate shared between the write path and the monitor.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub mod system;

pub use system::SystemClipboard;

/// Raw RGBA image data as read from the clipboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
    /// RGBA8 pixel data, row-major
    pub bytes: Vec<u8>,
}

impl RawImage {
    /// SHA-256 over dimensions and pixel data, hex-encoded.
    /// Used by the monitor to detect repeated image captures.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.width as u64).to_le_bytes());
        hasher.update((self.height as u64).to_le_bytes());
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }
}

/// Clipboard content
#[derive(Debug, Clone, PartialEq)]
pub enum ClipboardContent {
    /// Plain text
    Text(String),
    /// Raster image
    Image(RawImage),
}

impl ClipboardContent {
    /// Create new text content
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create new image content from RGBA8 pixels
    pub fn image(width: usize, height: usize, bytes: Vec<u8>) -> Self {
        Self::Image(RawImage {
            width,
            height,
            bytes,
        })
    }

    /// Get content as text if possible
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Image(_) => None,
        }
    }

    /// Check if content is text
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Check if content is an image
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }
}

/// Clipboard errors
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// Platform-specific error
    #[error("Platform error: {0}")]
    Platform(String),

    /// No content available
    #[error("No clipboard content available")]
    NoContent,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Clipboard provider trait
///
/// `fetch` prefers the image representation over text when both are
/// present on the clipboard.
#[async_trait]
pub trait ClipboardProvider: Send + Sync {
    /// Read current clipboard content
    async fn fetch(&self) -> Result<ClipboardContent, ClipboardError>;

    /// Write content to the clipboard
    async fn store(&self, content: &ClipboardContent) -> Result<(), ClipboardError>;

    /// Provider name
    fn name(&self) -> &str;
}

/// Create a clipboard provider for the current platform
pub fn create_provider() -> Result<Arc<dyn ClipboardProvider>, ClipboardError> {
    Ok(Arc::new(SystemClipboard::new()?))
}

/// One-shot echo suppression gate
///
/// The write path arms the gate immediately before writing to the OS
/// clipboard; the monitor consumes it on the next observed change and
/// ignores exactly that one cycle, so re-copying a stored entry never
/// produces a duplicate history row.
#[derive(Debug, Default)]
pub struct CopyGate {
    armed: AtomicBool,
}

impl CopyGate {
    /// Create a disarmed gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the gate for the next observed clipboard change
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Consume the gate. Returns true if it was armed.
    pub fn take(&self) -> bool {
        self.armed.swap(false, Ordering::SeqCst)
    }

    /// Peek without consuming
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

/// Clipboard writer that arms the echo gate around every write
pub struct GatedWriter {
    provider: Arc<dyn ClipboardProvider>,
    gate: Arc<CopyGate>,
}

impl GatedWriter {
    /// Create a writer sharing `gate` with a monitor
    pub fn new(provider: Arc<dyn ClipboardProvider>, gate: Arc<CopyGate>) -> Self {
        Self { provider, gate }
    }

    /// Write `content` to the clipboard without it re-entering history
    pub async fn copy(&self, content: &ClipboardContent) -> Result<(), ClipboardError> {
        self.gate.arm();
        match self.provider.store(content).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Nothing was written, so there is nothing to suppress
                self.gate.take();
                Err(e)
            }
        }
    }
}
