//! Clipboard history management and persistence

pub mod store;

pub use store::{HistoryStore, StoreStats};

use serde::{Deserialize, Serialize};

/// Kind of content held by a history item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Inline text content
    Text,
    /// Reference to a PNG file saved from the clipboard
    Image,
}

impl ItemKind {
    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Text => "text",
            ItemKind::Image => "image",
        }
    }

    /// Parse the database representation. Unknown kinds read back as text
    /// so a schema bump never makes existing rows unreadable.
    pub fn from_db(value: &str) -> Self {
        match value {
            "image" => ItemKind::Image,
            _ => ItemKind::Text,
        }
    }
}

/// One persisted clipboard entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipItem {
    /// Row id assigned by the store
    pub id: i64,
    /// Text or image
    pub kind: ItemKind,
    /// Inline text, or the path to the saved image file
    pub content: String,
    /// Capture time, unix seconds
    pub timestamp: i64,
    /// Favorites are exempt from retention eviction
    pub is_favorite: bool,
    /// Insertion time, unix seconds
    pub created_at: i64,
}

impl ClipItem {
    /// Single-line preview of the content, truncated to `max_chars`
    pub fn preview(&self, max_chars: usize) -> String {
        let flat = self.content.replace(['\n', '\r'], " ");
        let mut preview: String = flat.chars().take(max_chars).collect();
        if flat.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}
