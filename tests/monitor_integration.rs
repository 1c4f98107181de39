//! End-to-end tests for the change detector over a mock clipboard

use async_trait::async_trait;
use clipkeep::clipboard::{
    ClipboardContent, ClipboardError, ClipboardProvider, CopyGate, GatedWriter,
};
use clipkeep::config::{HistoryConfig, MonitorConfig};
use clipkeep::history::{HistoryStore, ItemKind};
use clipkeep::monitor::ClipboardMonitor;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::Mutex;
use tempfile::TempDir;

/// In-memory clipboard standing in for the OS clipboard
#[derive(Default)]
struct FakeClipboard {
    content: Mutex<Option<ClipboardContent>>,
}

impl FakeClipboard {
    fn user_copies(&self, content: ClipboardContent) {
        *self.content.lock().unwrap() = Some(content);
    }
}

#[async_trait]
impl ClipboardProvider for FakeClipboard {
    async fn fetch(&self) -> Result<ClipboardContent, ClipboardError> {
        self.content
            .lock()
            .unwrap()
            .clone()
            .ok_or(ClipboardError::NoContent)
    }

    async fn store(&self, content: &ClipboardContent) -> Result<(), ClipboardError> {
        *self.content.lock().unwrap() = Some(content.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct Harness {
    clipboard: Arc<FakeClipboard>,
    store: Arc<HistoryStore>,
    gate: Arc<CopyGate>,
    monitor: ClipboardMonitor,
    _temp_dir: TempDir,
}

async fn harness() -> Harness {
    let temp_dir = TempDir::new().unwrap();

    let history_config = HistoryConfig {
        db_path: temp_dir.path().join("history.db"),
        cap: 200,
        dedup_window_secs: 60,
    };
    let monitor_config = MonitorConfig {
        poll_interval_ms: 500,
        images_dir: temp_dir.path().join("images"),
        max_text_bytes: 1024 * 1024,
    };

    let clipboard = Arc::new(FakeClipboard::default());
    let store = Arc::new(HistoryStore::open(&history_config).await.unwrap());
    let gate = Arc::new(CopyGate::new());
    let monitor = ClipboardMonitor::new(
        clipboard.clone(),
        store.clone(),
        gate.clone(),
        &monitor_config,
    );

    Harness {
        clipboard,
        store,
        gate,
        monitor,
        _temp_dir: temp_dir,
    }
}

#[tokio::test]
async fn test_copy_browse_recopy_cycle() {
    let mut h = harness().await;

    // User copies a few things over time
    h.clipboard.user_copies(ClipboardContent::text("alpha"));
    h.monitor.poll_once().await.unwrap();
    h.clipboard.user_copies(ClipboardContent::text("beta"));
    h.monitor.poll_once().await.unwrap();
    h.clipboard.user_copies(ClipboardContent::text("gamma"));
    h.monitor.poll_once().await.unwrap();

    let items = h.store.get_history(10).await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].content, "gamma");

    // The presentation layer restores "alpha" through the gated writer
    let writer = GatedWriter::new(h.clipboard.clone(), h.gate.clone());
    let alpha = items.iter().find(|i| i.content == "alpha").unwrap();
    writer
        .copy(&ClipboardContent::Text(alpha.content.clone()))
        .await
        .unwrap();

    // The clipboard now holds "alpha", but the next ticks must not
    // record a duplicate history entry
    h.monitor.poll_once().await.unwrap();
    h.monitor.poll_once().await.unwrap();

    let stats = h.store.stats().await.unwrap();
    assert_eq!(stats.total, 3);

    // And the clipboard really does hold the restored content
    assert_eq!(
        h.clipboard.fetch().await.unwrap(),
        ClipboardContent::text("alpha")
    );
}

#[tokio::test]
async fn test_image_over_text_preference_is_providers_concern() {
    let mut h = harness().await;

    // The provider resolves mixed content; the monitor just stores what
    // it is handed. An image lands as an image row with a real file.
    h.clipboard
        .user_copies(ClipboardContent::image(4, 4, vec![42u8; 64]));
    assert_eq!(h.monitor.poll_once().await.unwrap(), Some(ItemKind::Image));

    let items = h.store.get_history(10).await.unwrap();
    assert_eq!(items[0].kind, ItemKind::Image);
    assert!(std::path::Path::new(&items[0].content).exists());
}

#[tokio::test]
async fn test_alternating_content_kinds() {
    let mut h = harness().await;

    h.clipboard.user_copies(ClipboardContent::text("some text"));
    assert_eq!(h.monitor.poll_once().await.unwrap(), Some(ItemKind::Text));

    h.clipboard
        .user_copies(ClipboardContent::image(2, 2, vec![1u8; 16]));
    assert_eq!(h.monitor.poll_once().await.unwrap(), Some(ItemKind::Image));

    // Back to the same text: the monitor still remembers it, no new row
    h.clipboard.user_copies(ClipboardContent::text("some text"));
    assert_eq!(h.monitor.poll_once().await.unwrap(), None);

    let stats = h.store.stats().await.unwrap();
    assert_eq!(stats.total, 2);
}

#[tokio::test]
async fn test_monitor_shutdown_is_cooperative() {
    let Harness {
        monitor, _temp_dir, ..
    } = harness().await;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let task = tokio::spawn(monitor.run(shutdown_rx));

    shutdown_tx.send(true).unwrap();

    // The loop must observe the flag and exit promptly
    tokio::time::timeout(std::time::Duration::from_secs(5), task)
        .await
        .expect("monitor did not shut down")
        .unwrap();
}
