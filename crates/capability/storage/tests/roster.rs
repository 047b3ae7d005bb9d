use tracker_storage::{InMemoryTrackerStore, RosterStore};

#[tokio::test]
async fn outfit_cache_roundtrip() {
    let store = InMemoryTrackerStore::new();

    let miss = store.lookup_outfit_cache(1).await.expect("lookup");
    assert!(miss.is_none());

    store
        .upsert_character_outfit(1, 37509488620604883, 1_000)
        .await
        .expect("upsert");
    let entry = store
        .lookup_outfit_cache(1)
        .await
        .expect("lookup")
        .expect("entry");
    assert_eq!(entry.outfit_id, 37509488620604883);
    assert_eq!(entry.updated_at_ms, 1_000);
}

#[tokio::test]
async fn outfit_cache_upsert_overwrites() {
    let store = InMemoryTrackerStore::new();

    store
        .upsert_character_outfit(1, 10, 1_000)
        .await
        .expect("first");
    store
        .upsert_character_outfit(1, 0, 2_000)
        .await
        .expect("second");

    let entry = store
        .lookup_outfit_cache(1)
        .await
        .expect("lookup")
        .expect("entry");
    assert_eq!(entry.outfit_id, 0);
    assert_eq!(entry.updated_at_ms, 2_000);
}

#[tokio::test]
async fn character_and_outfit_upserts_are_idempotent() {
    let store = InMemoryTrackerStore::new();

    store
        .upsert_character(5428010, "Higby", 2, 1)
        .await
        .expect("character");
    store
        .upsert_character(5428010, "Higby", 2, 1)
        .await
        .expect("character again");
    assert!(store.has_character(5428010));

    store
        .upsert_outfit(42, "HIGB", "Higby's Heroes", 2, 1)
        .await
        .expect("outfit");
    store
        .upsert_outfit(42, "HIGB", "Higby's Heroes", 2, 1)
        .await
        .expect("outfit again");
    assert!(store.has_outfit(42));
}
