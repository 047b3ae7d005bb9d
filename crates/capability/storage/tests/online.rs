use tracker_storage::{InMemoryTrackerStore, OnlineStore};

#[tokio::test]
async fn online_add_and_remove() {
    let store = InMemoryTrackerStore::new();

    store.online_add(5428010).await.expect("add");
    assert!(store.online_snapshot().contains(&5428010));

    store.online_remove(5428010).await.expect("remove");
    assert!(store.online_snapshot().is_empty());
}

#[tokio::test]
async fn online_add_is_idempotent() {
    let store = InMemoryTrackerStore::new();

    store.online_add(1).await.expect("add");
    store.online_add(1).await.expect("add again");
    assert_eq!(store.online_snapshot().len(), 1);
}

#[tokio::test]
async fn online_remove_absent_is_noop() {
    let store = InMemoryTrackerStore::new();

    store.online_remove(999).await.expect("remove absent");
    assert!(store.online_snapshot().is_empty());
}

#[tokio::test]
async fn clear_online_set_empties_everything() {
    let store = InMemoryTrackerStore::new();

    store.online_add(1).await.expect("add");
    store.online_add(2).await.expect("add");
    store.clear_online_set().await.expect("clear");
    assert!(store.online_snapshot().is_empty());
}
