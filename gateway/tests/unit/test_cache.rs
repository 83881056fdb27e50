//! Cache unit tests

use std::sync::Arc;
use std::time::Duration;

use flowgate::cache::definition::DefinitionCache;

use crate::sync_request;

#[test]
fn test_definition_cache_insert_and_get() {
    let cache = DefinitionCache::new(10);
    cache.put(1001, sync_request("daily"));

    let entry = cache.get(1001);
    assert!(entry.is_some());
    let entry = entry.unwrap();
    assert_eq!(entry.request.workflow_name, "daily");
    assert_eq!(entry.request.tasks.len(), 2);
    assert!(cache.get(1002).is_none());
}

#[test]
fn test_definition_cache_eviction() {
    let cache = DefinitionCache::new(2);

    cache.put(1, sync_request("one"));
    cache.put(2, sync_request("two"));
    cache.put(3, sync_request("three"));

    // Cache should have evicted the oldest entry
    assert_eq!(cache.len(), 2);
    assert!(cache.get(1).is_none());
    assert_eq!(cache.capacity(), 2);
}

#[test]
fn test_definition_cache_zero_capacity_is_unbounded() {
    let cache = DefinitionCache::new(0);
    for handle in 1..=500 {
        cache.put(handle, sync_request("wf"));
    }

    assert_eq!(cache.len(), 500);
    assert!(cache.get(1).is_some());
    assert!(cache.get(500).is_some());
}

#[test]
fn test_definition_cache_remove() {
    let cache = DefinitionCache::new(10);
    cache.put(1001, sync_request("daily"));
    assert!(cache.get(1001).is_some());

    assert!(cache.remove(1001).is_some());
    assert!(cache.get(1001).is_none());
    assert!(cache.remove(1001).is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_handle_lock_does_not_block_other_workflows() {
    let cache = Arc::new(DefinitionCache::new(10));
    let _held = cache.lock_handle(7).await;

    let unrelated = tokio::time::timeout(Duration::from_millis(100), cache.lock_handle(8)).await;
    assert!(unrelated.is_ok());

    let same = tokio::time::timeout(Duration::from_millis(50), cache.lock_handle(7)).await;
    assert!(same.is_err());
}

#[tokio::test]
async fn test_handle_lock_survives_removal_while_held() {
    let cache = Arc::new(DefinitionCache::new(10));
    cache.put(7, sync_request("daily"));
    let guard = cache.lock_handle(7).await;

    cache.remove(7);
    let other = cache.clone();
    let waiter = tokio::spawn(async move {
        let _guard = other.lock_handle(7).await;
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    drop(guard);
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
}
