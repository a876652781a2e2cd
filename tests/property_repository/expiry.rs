//! Key expiration across the primary record and its branch keys

use std::sync::Arc;
use std::time::Duration;

use keybranch::testing::{BackendOp, ScriptedBackend};
use keybranch::{ExpiryCleaner, InMemoryBackend, RepositoryConfig};

use crate::common::*;

#[tokio::test]
async fn test_expire_covers_every_key() {
    let backend = Arc::new(InMemoryBackend::new());
    let repo = property_repository(backend.clone());
    let mut p = property("p1", Location::Istanbul, 600, 2);
    repo.add(&mut p).await.unwrap();

    assert!(repo.set_key_expire(&p, Duration::from_secs(300)).await.unwrap());
    assert_eq!(backend.len(), 9);
    for key in backend.keys() {
        assert!(backend.time_to_live(&key).is_some(), "{key} has no ttl");
    }
}

#[tokio::test]
async fn test_expire_result_is_and_of_all_calls() {
    let backend = Arc::new(ScriptedBackend::new());
    let repo = property_repository(backend.clone());
    let mut p = property("p1", Location::Istanbul, 600, 2);
    repo.add(&mut p).await.unwrap();

    backend.refuse_expire("grouped:Location:Istanbul:sorted:Price");
    backend.clear_calls();

    assert!(!repo.set_key_expire(&p, Duration::from_secs(300)).await.unwrap());
    // The refusal doesn't stop the remaining keys from being expired
    let expired = backend.keys_for(BackendOp::KeyExpire);
    assert_eq!(expired.len(), 9);
    assert_eq!(expired[0], "Property:data:p1");
    assert!(backend
        .inner()
        .time_to_live("Property:grouped:Location:Istanbul:sorted:Price")
        .is_none());
    assert!(backend.inner().time_to_live("Property:grouped:Fair").is_some());
}

#[tokio::test]
async fn test_expire_unindexed_entity_is_partial() {
    let backend = Arc::new(InMemoryBackend::new());
    let repo = property_repository(backend.clone());
    let mut p = property("p1", Location::Berlin, 600, 2);
    p.is_active = false;
    repo.add(&mut p).await.unwrap();

    // Branch keys were never created, so only the primary record expires
    assert!(!repo.set_key_expire(&p, Duration::from_secs(300)).await.unwrap());
    assert!(backend.time_to_live("Property:data:p1").is_some());
}

#[tokio::test]
async fn test_expire_by_id() {
    let backend = Arc::new(InMemoryBackend::new());
    let repo = property_repository(backend.clone());
    repo.add(&mut property("p1", Location::London, 700, 2)).await.unwrap();

    assert!(repo
        .set_key_expire_by_id("p1", Duration::from_secs(60))
        .await
        .unwrap());
    assert!(!repo
        .set_key_expire_by_id("absent", Duration::from_secs(60))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_expired_entity_disappears_from_queries() {
    let backend = Arc::new(InMemoryBackend::new());
    let repo = property_repository(backend.clone());
    let mut p = property("p1", Location::London, 700, 2);
    repo.add(&mut p).await.unwrap();
    repo.set_key_expire(&p, Duration::from_millis(20)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;

    assert!(repo.get_by_id("p1").await.unwrap().is_none());
    assert!(repo.get_by_branch(BRANCH_LOCATION, &["London"]).await.unwrap().is_empty());
    assert_eq!(
        repo.count_by_sorted_branch(BRANCH_LOCATION_SORTBY_PRICE, &["London"])
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_cleaner_reclaims_expired_keys() {
    let backend = Arc::new(InMemoryBackend::new());
    let repo = property_repository(backend.clone());
    let mut p = property("p1", Location::London, 700, 2);
    repo.add(&mut p).await.unwrap();
    repo.set_key_expire(&p, Duration::from_millis(20)).await.unwrap();

    let cleaner = ExpiryCleaner::new(Arc::clone(&backend), Duration::from_millis(10));
    let handle = cleaner.start();
    tokio::time::sleep(Duration::from_millis(150)).await;
    cleaner.shutdown();
    handle.join().unwrap();

    assert!(backend.is_empty());
}

#[tokio::test]
async fn test_default_ttl_on_add() {
    let backend = Arc::new(InMemoryBackend::new());
    let config = RepositoryConfig {
        default_ttl_secs: Some(3600),
        ..RepositoryConfig::default()
    };
    let repo = property_repository_with(backend.clone(), config);
    repo.add(&mut property("p1", Location::Istanbul, 600, 2))
        .await
        .unwrap();

    let ttl = backend.time_to_live("Property:data:p1").unwrap();
    assert!(ttl <= Duration::from_secs(3600));
    assert!(ttl > Duration::from_secs(3500));
}
