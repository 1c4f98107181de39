//! SQLite-backed clipboard history store

use crate::config::HistoryConfig;
use crate::history::{ClipItem, ItemKind};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

const SCHEMA_VERSION: u32 = 1;

/// Aggregate counts over the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// All rows
    pub total: usize,
    /// Favorited rows
    pub favorites: usize,
    /// Configured retention cap for non-favorite rows
    pub cap: usize,
}

/// SQLite wrapper for clipboard history storage
///
/// The connection is guarded by a mutex so the store can be shared between
/// the monitor task and the presentation layer. There is never more than
/// one writer in practice.
pub struct HistoryStore {
    conn: Mutex<Connection>,
    cap: usize,
    dedup_window_secs: i64,
}

impl HistoryStore {
    /// Open (or create) the history database at `config.db_path`
    pub async fn open(config: &HistoryConfig) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.db_path)?;

        // WAL keeps readers unblocked while the monitor inserts
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        let store = Self {
            conn: Mutex::new(conn),
            cap: config.cap,
            dedup_window_secs: config.dedup_window_secs as i64,
        };

        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        let version = self.get_schema_version(&conn)?;

        if version == 0 {
            self.create_schema(&conn)?;
        } else if version < SCHEMA_VERSION {
            self.migrate_schema(&conn, version)?;
        }

        Ok(())
    }

    fn get_schema_version(&self, conn: &Connection) -> Result<u32> {
        let table_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Ok(0);
        }

        let version: Option<u32> = conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        Ok(version.unwrap_or(0))
    }

    fn create_schema(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER DEFAULT (strftime('%s', 'now'))
            );

            CREATE TABLE IF NOT EXISTS clipboard_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_items_timestamp
                ON clipboard_items(timestamp DESC);
            ",
        )?;

        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }

    fn migrate_schema(&self, _conn: &Connection, _from_version: u32) -> Result<()> {
        // Future migrations would go here
        Ok(())
    }

    /// Insert a new clipboard item
    ///
    /// Returns `Ok(false)` without inserting when the content is
    /// empty/whitespace-only or when the exact same content was already
    /// stored within the dedup window. After a successful insert the
    /// retention cap is enforced by evicting the oldest non-favorite rows.
    pub async fn add(&self, kind: ItemKind, content: &str, timestamp: i64) -> Result<bool> {
        if content.trim().is_empty() {
            return Ok(false);
        }

        let conn = self.conn.lock().await;

        let cutoff = timestamp - self.dedup_window_secs;
        let duplicates: i64 = conn.query_row(
            "SELECT COUNT(*) FROM clipboard_items
             WHERE content = ?1 AND timestamp > ?2",
            params![content, cutoff],
            |row| row.get(0),
        )?;

        if duplicates > 0 {
            debug!(kind = kind.as_str(), "skipping duplicate within dedup window");
            return Ok(false);
        }

        conn.execute(
            "INSERT INTO clipboard_items (kind, content, timestamp)
             VALUES (?1, ?2, ?3)",
            params![kind.as_str(), content, timestamp],
        )?;

        self.enforce_cap(&conn)?;

        Ok(true)
    }

    /// Evict the oldest non-favorite rows beyond the retention cap
    fn enforce_cap(&self, conn: &Connection) -> Result<()> {
        let non_favorites: i64 = conn.query_row(
            "SELECT COUNT(*) FROM clipboard_items WHERE is_favorite = 0",
            [],
            |row| row.get(0),
        )?;

        let excess = (non_favorites as usize).saturating_sub(self.cap);
        if excess > 0 {
            let removed = conn.execute(
                "DELETE FROM clipboard_items
                 WHERE id IN (
                     SELECT id FROM clipboard_items
                     WHERE is_favorite = 0
                     ORDER BY timestamp ASC, id ASC
                     LIMIT ?1
                 )",
                params![excess as i64],
            )?;
            debug!(removed, "evicted old history items");
        }

        Ok(())
    }

    /// Get recent items, favorites first, then newest first
    pub async fn get_history(&self, limit: usize) -> Result<Vec<ClipItem>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT id, kind, content, timestamp, is_favorite, created_at
             FROM clipboard_items
             ORDER BY is_favorite DESC, timestamp DESC, id DESC
             LIMIT ?1",
        )?;

        let items = stmt
            .query_map(params![limit as i64], row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Search items by content substring, same ordering as `get_history`
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<ClipItem>> {
        let conn = self.conn.lock().await;

        let pattern = format!("%{}%", query);
        let mut stmt = conn.prepare(
            "SELECT id, kind, content, timestamp, is_favorite, created_at
             FROM clipboard_items
             WHERE content LIKE ?1
             ORDER BY is_favorite DESC, timestamp DESC, id DESC
             LIMIT ?2",
        )?;

        let items = stmt
            .query_map(params![pattern, limit as i64], row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Get a single item by id
    pub async fn get(&self, id: i64) -> Result<Option<ClipItem>> {
        let conn = self.conn.lock().await;

        let item = conn
            .query_row(
                "SELECT id, kind, content, timestamp, is_favorite, created_at
                 FROM clipboard_items
                 WHERE id = ?1",
                params![id],
                row_to_item,
            )
            .optional()?;

        Ok(item)
    }

    /// Flip the favorite flag on an item. Returns false when no row matched.
    pub async fn toggle_favorite(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;

        let changed = conn.execute(
            "UPDATE clipboard_items SET is_favorite = NOT is_favorite WHERE id = ?1",
            params![id],
        )?;

        Ok(changed > 0)
    }

    /// Delete a single item. Returns false when no row matched.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;

        let changed = conn.execute("DELETE FROM clipboard_items WHERE id = ?1", params![id])?;

        Ok(changed > 0)
    }

    /// Clear the history, optionally preserving favorites.
    /// Returns the number of rows removed.
    pub async fn clear(&self, keep_favorites: bool) -> Result<usize> {
        let conn = self.conn.lock().await;

        let removed = if keep_favorites {
            conn.execute("DELETE FROM clipboard_items WHERE is_favorite = 0", [])?
        } else {
            conn.execute("DELETE FROM clipboard_items", [])?
        };

        debug!(removed, keep_favorites, "cleared history");
        Ok(removed)
    }

    /// Aggregate counts
    pub async fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock().await;

        let total: i64 =
            conn.query_row("SELECT COUNT(*) FROM clipboard_items", [], |row| row.get(0))?;
        let favorites: i64 = conn.query_row(
            "SELECT COUNT(*) FROM clipboard_items WHERE is_favorite = 1",
            [],
            |row| row.get(0),
        )?;

        Ok(StoreStats {
            total: total as usize,
            favorites: favorites as usize,
            cap: self.cap,
        })
    }
}

fn row_to_item(row: &Row) -> rusqlite::Result<ClipItem> {
    let kind: String = row.get(1)?;

    Ok(ClipItem {
        id: row.get(0)?,
        kind: ItemKind::from_db(&kind),
        content: row.get(2)?,
        timestamp: row.get(3)?,
        is_favorite: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_test_store(cap: usize) -> (HistoryStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();

        let config = HistoryConfig {
            db_path: temp_dir.path().join("test.db"),
            cap,
            dedup_window_secs: 60,
        };

        let store = HistoryStore::open(&config).await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_insert_and_retrieve() {
        let (store, _temp_dir) = setup_test_store(200).await;

        assert!(store.add(ItemKind::Text, "hello world", 1000).await.unwrap());

        let items = store.get_history(10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "hello world");
        assert_eq!(items[0].kind, ItemKind::Text);
        assert_eq!(items[0].timestamp, 1000);
        assert!(!items[0].is_favorite);
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let (store, _temp_dir) = setup_test_store(200).await;

        assert!(!store.add(ItemKind::Text, "", 1000).await.unwrap());
        assert!(!store.add(ItemKind::Text, "   \n\t", 1000).await.unwrap());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 0);
    }

    #[tokio::test]
    async fn test_dedup_window() {
        let (store, _temp_dir) = setup_test_store(200).await;

        assert!(store.add(ItemKind::Text, "repeat me", 1000).await.unwrap());
        // Same content 30s later falls inside the 60s window
        assert!(!store.add(ItemKind::Text, "repeat me", 1030).await.unwrap());

        let items = store.get_history(10).await.unwrap();
        assert_eq!(items.len(), 1);

        // Same content after the window goes in again
        assert!(store.add(ItemKind::Text, "repeat me", 1061).await.unwrap());

        let items = store.get_history(10).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_cap_evicts_oldest_non_favorites() {
        let (store, _temp_dir) = setup_test_store(5).await;

        for i in 0..8 {
            assert!(store
                .add(ItemKind::Text, &format!("item {}", i), 1000 + i)
                .await
                .unwrap());
        }

        let items = store.get_history(100).await.unwrap();
        assert_eq!(items.len(), 5);

        // Oldest evicted first: items 0..3 are gone
        assert_eq!(items[0].content, "item 7");
        assert_eq!(items[4].content, "item 3");
    }

    #[tokio::test]
    async fn test_favorites_exempt_from_eviction() {
        let (store, _temp_dir) = setup_test_store(3).await;

        store.add(ItemKind::Text, "keep me", 1000).await.unwrap();
        let items = store.get_history(10).await.unwrap();
        assert!(store.toggle_favorite(items[0].id).await.unwrap());

        for i in 0..10 {
            store
                .add(ItemKind::Text, &format!("filler {}", i), 2000 + i)
                .await
                .unwrap();
        }

        let items = store.get_history(100).await.unwrap();
        // 3 non-favorites plus the pinned one
        assert_eq!(items.len(), 4);

        let favorite = items.iter().find(|i| i.is_favorite).unwrap();
        assert_eq!(favorite.content, "keep me");

        let non_favorites = items.iter().filter(|i| !i.is_favorite).count();
        assert_eq!(non_favorites, 3);
    }

    #[tokio::test]
    async fn test_toggle_favorite_twice_restores_state() {
        let (store, _temp_dir) = setup_test_store(200).await;

        store.add(ItemKind::Text, "flip me", 1000).await.unwrap();
        let id = store.get_history(1).await.unwrap()[0].id;

        assert!(store.toggle_favorite(id).await.unwrap());
        assert!(store.get(id).await.unwrap().unwrap().is_favorite);

        assert!(store.toggle_favorite(id).await.unwrap());
        assert!(!store.get(id).await.unwrap().unwrap().is_favorite);
    }

    #[tokio::test]
    async fn test_toggle_favorite_missing_row() {
        let (store, _temp_dir) = setup_test_store(200).await;
        assert!(!store.toggle_favorite(12345).await.unwrap());
    }

    #[tokio::test]
    async fn test_search_ordering() {
        let (store, _temp_dir) = setup_test_store(200).await;

        store.add(ItemKind::Text, "apple pie", 1000).await.unwrap();
        store.add(ItemKind::Text, "banana bread", 1001).await.unwrap();
        store.add(ItemKind::Text, "apple juice", 1002).await.unwrap();

        // Favorite the oldest apple entry
        let items = store.search("apple pie", 10).await.unwrap();
        store.toggle_favorite(items[0].id).await.unwrap();

        let results = store.search("apple", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        // Favorites first, then newest first
        assert_eq!(results[0].content, "apple pie");
        assert_eq!(results[1].content, "apple juice");

        let no_hits = store.search("cherry", 10).await.unwrap();
        assert!(no_hits.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _temp_dir) = setup_test_store(200).await;

        store.add(ItemKind::Text, "ephemeral", 1000).await.unwrap();
        let id = store.get_history(1).await.unwrap()[0].id;

        assert!(store.delete(id).await.unwrap());
        assert!(store.get(id).await.unwrap().is_none());
        assert!(!store.delete(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_keeps_favorites() {
        let (store, _temp_dir) = setup_test_store(200).await;

        store.add(ItemKind::Text, "pinned", 1000).await.unwrap();
        store.add(ItemKind::Text, "disposable 1", 1001).await.unwrap();
        store.add(ItemKind::Text, "disposable 2", 1002).await.unwrap();

        let pinned_id = store.search("pinned", 1).await.unwrap()[0].id;
        store.toggle_favorite(pinned_id).await.unwrap();

        let removed = store.clear(true).await.unwrap();
        assert_eq!(removed, 2);

        let items = store.get_history(10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "pinned");

        let removed = store.clear(false).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let (store, _temp_dir) = setup_test_store(200).await;

        store.add(ItemKind::Text, "one", 1000).await.unwrap();
        store.add(ItemKind::Text, "two", 1001).await.unwrap();
        let id = store.get_history(1).await.unwrap()[0].id;
        store.toggle_favorite(id).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.favorites, 1);
        assert_eq!(stats.cap, 200);
    }

    #[tokio::test]
    async fn test_image_rows() {
        let (store, _temp_dir) = setup_test_store(200).await;

        store
            .add(ItemKind::Image, "/tmp/images/clip_1.png", 1000)
            .await
            .unwrap();

        let items = store.get_history(10).await.unwrap();
        assert_eq!(items[0].kind, ItemKind::Image);
        assert_eq!(items[0].content, "/tmp/images/clip_1.png");
    }

    #[tokio::test]
    async fn test_reopen_preserves_schema() {
        let temp_dir = TempDir::new().unwrap();
        let config = HistoryConfig {
            db_path: temp_dir.path().join("test.db"),
            cap: 200,
            dedup_window_secs: 60,
        };

        {
            let store = HistoryStore::open(&config).await.unwrap();
            store.add(ItemKind::Text, "survives reopen", 1000).await.unwrap();
        }

        let store = HistoryStore::open(&config).await.unwrap();
        let items = store.get_history(10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "survives reopen");
    }
}
