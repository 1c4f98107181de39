//! Clipboard change detection
//!
//! A single polling task diffs the clipboard against in-memory last-seen
//! state and writes genuinely new content into the history store. Images
//! are persisted as PNG files and deduplicated by content hash; text is
//! deduplicated by value. Writes performed by the application itself are
//! ignored for one cycle via the shared [`CopyGate`].

use crate::clipboard::{ClipboardContent, ClipboardError, ClipboardProvider, CopyGate, RawImage};
use crate::config::MonitorConfig;
use crate::history::{HistoryStore, ItemKind};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Notification emitted when a new item lands in history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Captured {
    /// Kind of the stored item
    pub kind: ItemKind,
}

/// Clipboard polling monitor
pub struct ClipboardMonitor {
    provider: Arc<dyn ClipboardProvider>,
    store: Arc<HistoryStore>,
    gate: Arc<CopyGate>,
    images_dir: PathBuf,
    poll_interval: Duration,
    max_text_bytes: usize,
    events: broadcast::Sender<Captured>,
    last_text: Option<String>,
    last_image_hash: Option<String>,
    save_seq: u64,
}

impl ClipboardMonitor {
    /// Create a monitor over `provider`, persisting into `store`
    pub fn new(
        provider: Arc<dyn ClipboardProvider>,
        store: Arc<HistoryStore>,
        gate: Arc<CopyGate>,
        config: &MonitorConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(64);

        Self {
            provider,
            store,
            gate,
            images_dir: config.images_dir.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_text_bytes: config.max_text_bytes,
            events,
            last_text: None,
            last_image_hash: None,
            save_seq: 0,
        }
    }

    /// Subscribe to capture notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Captured> {
        self.events.subscribe()
    }

    /// Run the polling loop until `shutdown` flips to true or is dropped
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            "clipboard monitor started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(Some(kind)) => {
                            debug!(kind = kind.as_str(), "captured clipboard item");
                        }
                        Ok(None) => {}
                        Err(e) => {
                            // Best effort: log and keep polling
                            warn!("clipboard poll failed: {:#}", e);
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("clipboard monitor stopped");
    }

    /// Inspect the clipboard once, persisting new content.
    /// Returns the kind of the item stored, if any.
    pub async fn poll_once(&mut self) -> Result<Option<ItemKind>> {
        let content = match self.provider.fetch().await {
            Ok(content) => content,
            Err(ClipboardError::NoContent) => return Ok(None),
            Err(e) => return Err(e).context("failed to read clipboard"),
        };

        if self.gate.take() {
            // Our own write; remember it so the next tick stays quiet
            debug!("ignoring self-triggered clipboard change");
            self.remember(&content);
            return Ok(None);
        }

        match content {
            ClipboardContent::Text(text) => self.capture_text(text).await,
            ClipboardContent::Image(img) => self.capture_image(img).await,
        }
    }

    fn remember(&mut self, content: &ClipboardContent) {
        match content {
            ClipboardContent::Text(text) => self.last_text = Some(text.clone()),
            ClipboardContent::Image(img) => self.last_image_hash = Some(img.content_hash()),
        }
    }

    async fn capture_text(&mut self, text: String) -> Result<Option<ItemKind>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        if text.len() > self.max_text_bytes {
            debug!(bytes = text.len(), "skipping oversized text entry");
            return Ok(None);
        }
        if self.last_text.as_deref() == Some(text.as_str()) {
            return Ok(None);
        }

        let timestamp = Local::now().timestamp();
        let inserted = self.store.add(ItemKind::Text, &text, timestamp).await?;
        self.last_text = Some(text);

        if inserted {
            let _ = self.events.send(Captured {
                kind: ItemKind::Text,
            });
            Ok(Some(ItemKind::Text))
        } else {
            Ok(None)
        }
    }

    async fn capture_image(&mut self, img: RawImage) -> Result<Option<ItemKind>> {
        let hash = img.content_hash();
        if self.last_image_hash.as_deref() == Some(hash.as_str()) {
            return Ok(None);
        }

        let now = Local::now();
        let path = self.save_png(&img, &now)?;
        let inserted = self
            .store
            .add(ItemKind::Image, &path.to_string_lossy(), now.timestamp())
            .await?;
        self.last_image_hash = Some(hash);

        if inserted {
            let _ = self.events.send(Captured {
                kind: ItemKind::Image,
            });
            Ok(Some(ItemKind::Image))
        } else {
            Ok(None)
        }
    }

    /// Encode the capture as PNG under a capture-timestamp filename
    fn save_png(&mut self, img: &RawImage, when: &DateTime<Local>) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.images_dir).with_context(|| {
            format!("failed to create image directory {}", self.images_dir.display())
        })?;

        // The sequence number keeps filenames unique when captures land
        // inside the same clock tick
        self.save_seq += 1;
        let name = format!(
            "clip_{}_{}.png",
            when.format("%Y%m%d_%H%M%S%3f"),
            self.save_seq
        );
        let path = self.images_dir.join(name);

        let buffer = image::RgbaImage::from_raw(
            img.width as u32,
            img.height as u32,
            img.bytes.clone(),
        )
        .ok_or_else(|| anyhow!("clipboard image buffer does not match its dimensions"))?;

        buffer
            .save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write {}", path.display()))?;

        debug!(path = %path.display(), "saved clipboard image");
        Ok(path)
    }
}

/// Load a saved capture back into raw RGBA data for re-copying
pub fn load_png(path: &Path) -> Result<RawImage> {
    let decoded =
        image::open(path).with_context(|| format!("failed to open image {}", path.display()))?;
    let rgba = decoded.to_rgba8();

    Ok(RawImage {
        width: rgba.width() as usize,
        height: rgba.height() as usize,
        bytes: rgba.into_raw(),
    })
}
