//! System clipboard implementation backed by arboard

use super::{ClipboardContent, ClipboardError, ClipboardProvider};
use async_trait::async_trait;
use std::borrow::Cow;
use std::sync::Mutex;

/// System clipboard provider
///
/// arboard's handle is not `Sync`, so it lives behind a mutex. Every
/// operation is a fast local call; the lock is never held across awaits.
pub struct SystemClipboard {
    inner: Mutex<arboard::Clipboard>,
}

impl SystemClipboard {
    /// Connect to the system clipboard
    pub fn new() -> Result<Self, ClipboardError> {
        let clipboard = arboard::Clipboard::new()
            .map_err(|e| ClipboardError::Platform(format!("Failed to open clipboard: {}", e)))?;

        Ok(Self {
            inner: Mutex::new(clipboard),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, arboard::Clipboard>, ClipboardError> {
        self.inner
            .lock()
            .map_err(|_| ClipboardError::Platform("clipboard handle poisoned".to_string()))
    }
}

#[async_trait]
impl ClipboardProvider for SystemClipboard {
    async fn fetch(&self) -> Result<ClipboardContent, ClipboardError> {
        let mut clipboard = self.lock()?;

        // Prefer the image representation when both are present
        match clipboard.get_image() {
            Ok(image) => {
                return Ok(ClipboardContent::image(
                    image.width,
                    image.height,
                    image.bytes.into_owned(),
                ));
            }
            Err(arboard::Error::ContentNotAvailable) => {}
            Err(e) => {
                return Err(ClipboardError::Platform(format!(
                    "Failed to read clipboard image: {}",
                    e
                )));
            }
        }

        match clipboard.get_text() {
            Ok(text) if !text.is_empty() => Ok(ClipboardContent::Text(text)),
            Ok(_) => Err(ClipboardError::NoContent),
            Err(arboard::Error::ContentNotAvailable) => Err(ClipboardError::NoContent),
            Err(e) => Err(ClipboardError::Platform(format!(
                "Failed to read clipboard text: {}",
                e
            ))),
        }
    }

    async fn store(&self, content: &ClipboardContent) -> Result<(), ClipboardError> {
        let mut clipboard = self.lock()?;

        match content {
            ClipboardContent::Text(text) => clipboard
                .set_text(text.clone())
                .map_err(|e| ClipboardError::Platform(format!("Failed to set text: {}", e))),
            ClipboardContent::Image(image) => {
                let data = arboard::ImageData {
                    width: image.width,
                    height: image.height,
                    bytes: Cow::Borrowed(&image.bytes),
                };
                clipboard
                    .set_image(data)
                    .map_err(|e| ClipboardError::Platform(format!("Failed to set image: {}", e)))
            }
        }
    }

    fn name(&self) -> &str {
        "system"
    }
}
