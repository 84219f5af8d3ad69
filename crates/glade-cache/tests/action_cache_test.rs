//! Integration tests for controller and action caches.

mod common;

use common::{disabled_backend, memory_backend, sequence_scoring};
use glade_cache::{ActionCache, CacheError, CacheOptions, ControllerCache, Strategy};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Item {
    id: u32,
    name: String,
}

fn item(id: u32) -> Item {
    Item {
        id,
        name: format!("item-{id}"),
    }
}

#[tokio::test]
async fn test_default_identity() {
    let backend = memory_backend();
    let cache = ControllerCache::new(&backend, "", "", CacheOptions::new()).unwrap();

    assert_eq!(cache.namespace().as_str(), "UNDEFINED-CONTROLLER!:UNDEFINED-ACTION:");
    assert_eq!(cache.cache().options().max, 3);
}

#[tokio::test]
async fn test_namespace_with_sub_namespace_and_entity() {
    let backend = memory_backend();
    let cache = ControllerCache::new(
        &backend,
        "ActionCacheTestController",
        "populateNamespace",
        CacheOptions::new().namespace("v1").entity(42),
    )
    .unwrap();

    assert_eq!(
        cache.namespace().as_str(),
        "ActionCacheTestController:populateNamespace:v1:42:"
    );
}

#[tokio::test]
async fn test_resolve_populates_once() {
    let backend = memory_backend();
    let actions = ActionCache::new(&backend, "ActionCacheTestController");
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        let value: Option<Item> = actions
            .resolve("findOne", "/items/1", CacheOptions::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CacheError>(item(1))
            })
            .await
            .unwrap();
        assert_eq!(value, Some(item(1)));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_entries_carry_qualified_keys() {
    let backend = memory_backend();
    let actions = ActionCache::new(&backend, "ActionCacheTestController");
    let options = || CacheOptions::new().max(5).namespace("v1");

    for id in 1..=2 {
        let key = format!("populate-namespace?id={id}");
        let _: Option<Item> = actions
            .resolve("populateNamespace", &key, options(), || async {
                Ok::<_, CacheError>(item(id))
            })
            .await
            .unwrap();
    }

    let cache = actions.action("populateNamespace", options()).unwrap();
    let entries = cache.cache().entries::<Item>().await.unwrap();
    let keys: Vec<_> = entries.iter().map(|(key, _)| key.as_str()).collect();

    assert_eq!(entries.len(), 2);
    assert!(keys.contains(&"ActionCacheTestController:populateNamespace:v1:populate-namespace?id=1"));
    assert!(keys.contains(&"ActionCacheTestController:populateNamespace:v1:populate-namespace?id=2"));
}

#[tokio::test]
async fn test_entity_caches_are_isolated() {
    let backend = memory_backend();
    let actions = ActionCache::new(&backend, "Documents");

    let first = actions.action("Get", CacheOptions::new().entity("doc-1")).unwrap();
    let second = actions.action("Get", CacheOptions::new().entity("doc-2")).unwrap();

    first.cache().set("/revisions", &item(1)).await.unwrap();
    second.cache().set("/revisions", &item(2)).await.unwrap();

    assert_eq!(first.cached_version::<Item>("/revisions").await.unwrap(), Some(item(1)));
    assert_eq!(second.cached_version::<Item>("/revisions").await.unwrap(), Some(item(2)));

    // Invalidating one document leaves the other untouched
    first.cache().reset().await.unwrap();
    assert_eq!(first.cached_version::<Item>("/revisions").await.unwrap(), None);
    assert_eq!(second.cached_version::<Item>("/revisions").await.unwrap(), Some(item(2)));
}

#[tokio::test]
async fn test_action_reaches_other_operation_cache() {
    let backend = memory_backend();
    let actions = ActionCache::new(&backend, "Widgets");

    let _: Option<Item> = actions
        .resolve("FindOne", "/widgets/7", CacheOptions::new(), || async {
            Ok::<_, CacheError>(item(7))
        })
        .await
        .unwrap();

    // An update handler drops the stale entry of another operation
    let find_one = actions.action("FindOne", CacheOptions::new()).unwrap();
    find_one.cache().del("/widgets/7").await.unwrap();

    assert_eq!(find_one.cached_version::<Item>("/widgets/7").await.unwrap(), None);
}

#[tokio::test]
async fn test_resolve_blank_result_is_not_cached() {
    let backend = memory_backend();
    let actions = ActionCache::new(&backend, "Search");
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
        let value: Option<String> = actions
            .resolve("Query", "/search?q=", CacheOptions::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CacheError>(String::new())
            })
            .await
            .unwrap();
        assert_eq!(value, None);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let cache = actions.action("Query", CacheOptions::new()).unwrap();
    assert_eq!(cache.cache().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_resolve_propagates_compute_error() {
    let backend = memory_backend();
    let actions = ActionCache::new(&backend, "Widgets");

    let result: Result<Option<Item>, CacheError> = actions
        .resolve("FindOne", "/widgets/404", CacheOptions::new(), || async {
            Err(CacheError::compute(anyhow::anyhow!("not found")))
        })
        .await;

    assert!(matches!(result, Err(CacheError::ComputeFailure(_))));
    let cache = actions.action("FindOne", CacheOptions::new()).unwrap();
    assert_eq!(cache.cache().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_configure_rebinds_namespace_and_keeps_old_entries() {
    let backend = memory_backend();
    let mut cache = ControllerCache::new(
        &backend,
        "Documents",
        "Get",
        CacheOptions::new().entity("doc-1"),
    )
    .unwrap();
    cache.cache().set("/a", &item(1)).await.unwrap();

    cache
        .configure(CacheOptions::new().entity("doc-2").max(1))
        .unwrap();
    assert_eq!(cache.namespace().as_str(), "Documents:Get:doc-2:");
    assert_eq!(cache.cache().options().max, 1);
    assert_eq!(cache.cached_version::<Item>("/a").await.unwrap(), None);

    let previous = ControllerCache::new(
        &backend,
        "Documents",
        "Get",
        CacheOptions::new().entity("doc-1"),
    )
    .unwrap();
    assert_eq!(previous.cached_version::<Item>("/a").await.unwrap(), Some(item(1)));
}

#[tokio::test]
async fn test_configure_rejects_zero_capacity() {
    let backend = memory_backend();
    let mut cache = ControllerCache::new(&backend, "Widgets", "List", CacheOptions::new().max(4)).unwrap();

    let result = cache.configure(CacheOptions::new().max(0));

    assert!(matches!(result, Err(CacheError::InvalidConfiguration(_))));
    assert_eq!(cache.cache().options().max, 4);
}

#[tokio::test]
async fn test_frequency_strategy_through_options() {
    let backend = memory_backend();
    let cache = ControllerCache::new(
        &backend,
        "Widgets",
        "Popular",
        CacheOptions::new().max(2).strategy(Strategy::Frequency),
    )
    .unwrap();
    let lru = cache.cache();

    lru.set("a", &1).await.unwrap();
    lru.get::<u32>("a").await.unwrap();
    lru.get::<u32>("a").await.unwrap();
    lru.set("b", &2).await.unwrap();
    lru.set("c", &3).await.unwrap();

    assert!(lru.has("a").await.unwrap());
    assert!(!lru.has("b").await.unwrap());
    assert!(lru.has("c").await.unwrap());
}

#[tokio::test]
async fn test_recency_strategy_through_options() {
    let backend = memory_backend();
    let cache = ControllerCache::new(
        &backend,
        "Widgets",
        "Latest",
        CacheOptions::new().max(2).strategy(Strategy::Recency),
    )
    .unwrap();
    let lru = cache.cache();

    lru.set("b", &1).await.unwrap();
    lru.set("a", &2).await.unwrap();
    lru.get::<u32>("b").await.unwrap();
    lru.set("c", &3).await.unwrap();

    assert_eq!(lru.keys().await.unwrap(), vec!["c", "b"]);
}

#[tokio::test]
async fn test_custom_scoring_through_options() {
    let backend = memory_backend();
    let cache = ControllerCache::new(
        &backend,
        "Widgets",
        "Recent",
        CacheOptions::new().max(2).scoring(sequence_scoring()),
    )
    .unwrap();
    let lru = cache.cache();

    lru.set("a", &1).await.unwrap();
    lru.set("b", &2).await.unwrap();
    lru.get::<u32>("a").await.unwrap();
    lru.set("c", &3).await.unwrap();

    assert_eq!(lru.keys().await.unwrap(), vec!["c", "a"]);
}

#[tokio::test]
async fn test_action_defaults_fill_unset_options() {
    let backend = memory_backend();
    let actions = ActionCache::new(&backend, "Widgets")
        .with_defaults(CacheOptions::new().max(10).namespace("ignored"));

    let cache = actions.action("List", CacheOptions::new()).unwrap();
    assert_eq!(cache.cache().options().max, 10);
    assert_eq!(cache.namespace().as_str(), "Widgets:List:");

    let overridden = actions.action("List", CacheOptions::new().max(2)).unwrap();
    assert_eq!(overridden.cache().options().max, 2);
}

#[tokio::test]
async fn test_resolve_when_disabled_always_computes() {
    let backend = disabled_backend();
    let actions = ActionCache::new(&backend, "Widgets");
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
        let value: Option<Item> = actions
            .resolve("FindOne", "/widgets/1", CacheOptions::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CacheError>(item(1))
            })
            .await
            .unwrap();
        assert_eq!(value, Some(item(1)));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
