//! Conformance suite shared by every state store backend.

use crate::error::StateError;
use crate::store::StateStore;

/// Run the full state store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_store_conformance_tests(store: &dyn StateStore) -> Result<(), StateError> {
    test_get_missing(store).await?;
    test_set_and_get(store).await?;
    test_overwrite(store).await?;
    test_keys_prefix(store).await?;
    test_delete(store).await?;
    test_sorted_set(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn StateStore) -> Result<(), StateError> {
    let val = store.get("conformance:missing").await?;
    assert!(val.is_none(), "get on missing key should return None");
    Ok(())
}

async fn test_set_and_get(store: &dyn StateStore) -> Result<(), StateError> {
    store.set("conformance:set-get", "hello").await?;
    let val = store.get("conformance:set-get").await?;
    assert_eq!(val.as_deref(), Some("hello"));
    Ok(())
}

async fn test_overwrite(store: &dyn StateStore) -> Result<(), StateError> {
    store.set("conformance:overwrite", "v1").await?;
    store.set("conformance:overwrite", "v2").await?;
    let val = store.get("conformance:overwrite").await?;
    assert_eq!(val.as_deref(), Some("v2"), "set should overwrite");
    Ok(())
}

async fn test_keys_prefix(store: &dyn StateStore) -> Result<(), StateError> {
    store.set("conformance:keys:a", "1").await?;
    store.set("conformance:keys:b", "2").await?;
    store.set("conformance:other:c", "3").await?;

    let mut keys = store.keys("conformance:keys:").await?;
    keys.sort();
    assert_eq!(keys, vec!["conformance:keys:a", "conformance:keys:b"]);

    let none = store.keys("conformance:absent:").await?;
    assert!(none.is_empty(), "unknown prefix should enumerate nothing");
    Ok(())
}

async fn test_delete(store: &dyn StateStore) -> Result<(), StateError> {
    store.set("conformance:del:a", "1").await?;
    store.set("conformance:del:b", "2").await?;

    let removed = store
        .delete(&[
            "conformance:del:a".to_owned(),
            "conformance:del:b".to_owned(),
            "conformance:del:ghost".to_owned(),
        ])
        .await?;
    assert_eq!(removed, 2, "delete should count only existing keys");
    assert!(store.get("conformance:del:a").await?.is_none());
    Ok(())
}

async fn test_sorted_set(store: &dyn StateStore) -> Result<(), StateError> {
    store.zadd("conformance:zset", "late", 30.0).await?;
    store.zadd("conformance:zset", "early", 10.0).await?;
    store.zadd("conformance:zset", "middle", 20.0).await?;

    let all = store.zrange("conformance:zset", 0, -1).await?;
    assert_eq!(all, vec!["early", "middle", "late"], "ascending by score");

    // Re-adding an existing member moves it.
    store.zadd("conformance:zset", "early", 40.0).await?;
    let all = store.zrange("conformance:zset", 0, -1).await?;
    assert_eq!(all, vec!["middle", "late", "early"]);

    let removed = store.zrem_by_score("conformance:zset", 0.0, 25.0).await?;
    assert_eq!(removed, 1, "only `middle` falls in [0, 25]");
    let rest = store.zrange("conformance:zset", 0, -1).await?;
    assert_eq!(rest, vec!["late", "early"]);
    Ok(())
}
