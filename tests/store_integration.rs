//! Integration tests for the history store

use clipkeep::config::HistoryConfig;
use clipkeep::history::{HistoryStore, ItemKind};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

async fn open_store(temp_dir: &TempDir, cap: usize) -> HistoryStore {
    let config = HistoryConfig {
        db_path: temp_dir.path().join("history.db"),
        cap,
        dedup_window_secs: 60,
    };
    HistoryStore::open(&config).await.unwrap()
}

#[tokio::test]
async fn test_full_history_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir, 200).await;

    assert!(store.add(ItemKind::Text, "first entry", 1000).await.unwrap());
    assert!(store.add(ItemKind::Text, "second entry", 1001).await.unwrap());
    assert!(store
        .add(ItemKind::Image, "/tmp/clipkeep/clip_1.png", 1002)
        .await
        .unwrap());

    // Newest first when nothing is favorited
    let items = store.get_history(10).await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].kind, ItemKind::Image);
    assert_eq!(items[1].content, "second entry");
    assert_eq!(items[2].content, "first entry");

    // Favoriting reorders and survives a clear
    let first_id = items[2].id;
    assert!(store.toggle_favorite(first_id).await.unwrap());

    let items = store.get_history(10).await.unwrap();
    assert_eq!(items[0].content, "first entry");
    assert!(items[0].is_favorite);

    let removed = store.clear(true).await.unwrap();
    assert_eq!(removed, 2);

    let items = store.get_history(10).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content, "first entry");
}

#[tokio::test]
async fn test_dedup_window_boundary() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir, 200).await;

    assert!(store.add(ItemKind::Text, "dup check", 1000).await.unwrap());

    // Inside the window: rejected
    assert!(!store.add(ItemKind::Text, "dup check", 1000).await.unwrap());
    assert!(!store.add(ItemKind::Text, "dup check", 1059).await.unwrap());

    // Past the window: accepted
    assert!(store.add(ItemKind::Text, "dup check", 1061).await.unwrap());

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total, 2);
}

#[tokio::test]
async fn test_cap_holds_under_churn() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir, 10).await;

    // Pin two early entries
    store.add(ItemKind::Text, "pin a", 100).await.unwrap();
    store.add(ItemKind::Text, "pin b", 101).await.unwrap();
    for item in store.get_history(10).await.unwrap() {
        store.toggle_favorite(item.id).await.unwrap();
    }

    for i in 0..50 {
        store
            .add(ItemKind::Text, &format!("churn {}", i), 1000 + i)
            .await
            .unwrap();
    }

    let items = store.get_history(100).await.unwrap();
    let favorites: Vec<_> = items.iter().filter(|i| i.is_favorite).collect();
    let non_favorites: Vec<_> = items.iter().filter(|i| !i.is_favorite).collect();

    // Exactly cap non-favorites survive, and both pins are intact
    assert_eq!(non_favorites.len(), 10);
    assert_eq!(favorites.len(), 2);

    // The survivors are the newest ten
    assert_eq!(non_favorites[0].content, "churn 49");
    assert_eq!(non_favorites[9].content, "churn 40");
}

#[tokio::test]
async fn test_search_matches_substring_only() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir, 200).await;

    store
        .add(ItemKind::Text, "the quick brown fox", 1000)
        .await
        .unwrap();
    store
        .add(ItemKind::Text, "lazy dogs sleep", 1001)
        .await
        .unwrap();
    store
        .add(ItemKind::Text, "quicksilver", 1002)
        .await
        .unwrap();

    let results = store.search("quick", 10).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].content, "quicksilver");
    assert_eq!(results[1].content, "the quick brown fox");

    // SQLite LIKE is case-insensitive for ASCII
    let results = store.search("QUICK", 10).await.unwrap();
    assert_eq!(results.len(), 2);

    let results = store.search("absent", 10).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_limit_is_respected() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir, 200).await;

    for i in 0..20 {
        store
            .add(ItemKind::Text, &format!("entry {}", i), 1000 + i)
            .await
            .unwrap();
    }

    assert_eq!(store.get_history(5).await.unwrap().len(), 5);
    assert_eq!(store.search("entry", 7).await.unwrap().len(), 7);
}
