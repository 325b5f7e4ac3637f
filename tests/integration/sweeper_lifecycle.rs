//! Background sweeper lifecycle against a live cache store.

use std::sync::Arc;
use std::time::Duration;

use clipforge::cache::{CacheConfig, CacheStore, CacheSweeper};
use clipforge::fingerprint::fingerprint;
use clipforge::types::ArtifactData;

#[tokio::test]
async fn sweeper_removes_only_expired_entries() {
    let store = Arc::new(CacheStore::new(CacheConfig {
        max_age_ms: 40,
        ..CacheConfig::default()
    }));

    store.put(
        fingerprint("case-042", "scene", "stale prompt"),
        "case-042",
        "scene",
        "stale prompt",
        ArtifactData::Locator("https://cdn.example/stale.mp4".to_string()),
    );

    let mut sweeper = CacheSweeper::start(Arc::clone(&store), Duration::from_millis(10));

    // Let the first entry expire, then add a fresh one the sweep must keep.
    tokio::time::sleep(Duration::from_millis(60)).await;
    store.put(
        fingerprint("case-042", "scene", "fresh prompt"),
        "case-042",
        "scene",
        "fresh prompt",
        ArtifactData::Locator("https://cdn.example/fresh.mp4".to_string()),
    );
    tokio::time::sleep(Duration::from_millis(30)).await;

    sweeper.stop().await;
    assert!(!sweeper.is_running());

    assert_eq!(store.len(), 1);
    assert!(store
        .get(&fingerprint("case-042", "scene", "fresh prompt"))
        .is_some());
}

#[tokio::test]
async fn stopped_sweeper_leaves_the_store_alone() {
    let store = Arc::new(CacheStore::new(CacheConfig {
        max_age_ms: 5,
        ..CacheConfig::default()
    }));

    let mut sweeper = CacheSweeper::start(Arc::clone(&store), Duration::from_millis(5));
    sweeper.stop().await;

    store.put(
        fingerprint("case-042", "scene", "prompt"),
        "case-042",
        "scene",
        "prompt",
        ArtifactData::Locator("u".to_string()),
    );
    tokio::time::sleep(Duration::from_millis(30)).await;

    // Expired but unswept: only a lookup or an explicit sweep removes it now.
    assert_eq!(store.len(), 1);
    assert_eq!(store.sweep_expired(), 1);
    assert!(store.is_empty());
}
