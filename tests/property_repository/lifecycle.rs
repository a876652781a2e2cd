//! Identifiers, codec round trips, events, configuration and failures

use std::sync::Arc;

use keybranch::testing::{BackendOp, ScriptedBackend};
use keybranch::{
    EntityState, Error, EventLog, InMemoryBackend, KeyValueBackend, MissingRecordPolicy,
    Repository, RepositoryConfig,
};
use tempfile::TempDir;

use crate::common::*;

#[tokio::test]
async fn test_round_trip_skips_transient_attributes() {
    let repo = property_repository(Arc::new(InMemoryBackend::new()));
    let mut p = property("p1", Location::London, 1234, 3);
    p.title = "Loft: near the river | quiet".to_string();
    p.viewed = true;
    repo.add(&mut p).await.unwrap();

    let loaded = repo.get_by_id("p1").await.unwrap().unwrap();
    assert!(!loaded.viewed);
    assert_eq!(loaded, Property { viewed: false, ..p });
}

#[tokio::test]
async fn test_stored_fields() {
    // No branches: a null timestamp only has to survive the primary write
    let backend = Arc::new(InMemoryBackend::new());
    let repo = Repository::<Property>::new(backend.clone()).unwrap();
    let mut p = property("p1", Location::Berlin, 900, 3);
    p.last_update = None;
    p.viewed = true;
    repo.add(&mut p).await.unwrap();

    let fields = backend.hash_get_all("Property:data:p1").await.unwrap();
    assert_eq!(fields.get("Id").map(String::as_str), Some("p1"));
    assert_eq!(fields.get("Location").map(String::as_str), Some("1"));
    assert_eq!(fields.get("IsActive").map(String::as_str), Some("true"));
    assert!(!fields.contains_key("Viewed"));
    assert!(!fields.contains_key("LastUpdateDateTime"));
}

#[tokio::test]
async fn test_missing_time_fails_sorted_branch() {
    let backend = Arc::new(ScriptedBackend::new());
    let repo = property_repository(backend.clone());
    let mut p = property("p1", Location::Berlin, 900, 3);
    p.last_update = None;

    // Keys and scores are computed before the first write
    assert!(matches!(
        repo.add(&mut p).await,
        Err(Error::TypeConversion { .. })
    ));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_generated_ids() {
    let repo = property_repository(Arc::new(InMemoryBackend::new()));
    let mut a = property("", Location::Istanbul, 100, 1);
    let mut b = property("", Location::Istanbul, 100, 1);
    repo.add(&mut a).await.unwrap();
    repo.add(&mut b).await.unwrap();

    assert!(!a.id.is_empty());
    assert_ne!(a.id, b.id);
    assert_eq!(repo.count_by_branch(BRANCH_LOCATION, &["Istanbul"]).await.unwrap(), 2);
}

#[tokio::test]
async fn test_events_in_mutation_order() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut repo = property_repository(backend);
    let log = EventLog::new();
    repo.subscribe(log.clone());

    let mut p = property("p1", Location::London, 700, 2);
    repo.add(&mut p).await.unwrap();
    p.price = 650;
    repo.update(&p).await.unwrap();
    assert!(repo.delete(&p).await.unwrap());
    assert!(!repo.delete_by_id("p1").await.unwrap());

    assert_eq!(
        log.events(),
        vec![
            ("p1".to_string(), EntityState::Added),
            ("p1".to_string(), EntityState::Updated),
            ("p1".to_string(), EntityState::Deleted),
        ]
    );
}

#[tokio::test]
async fn test_partial_failure_is_left_in_place() {
    let backend = Arc::new(ScriptedBackend::new());
    let mut repo = property_repository(backend.clone());
    let log = EventLog::new();
    repo.subscribe(log.clone());
    backend.fail_on(BackendOp::SetAdd, "RoomNumber");

    let mut p = property("p1", Location::Berlin, 500, 2);
    let err = repo.add(&mut p).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(log.is_empty());

    // Written before the failing call
    assert!(repo.get_by_id("p1").await.unwrap().is_some());
    assert_eq!(repo.count_by_branch(BRANCH_LOCATION, &["Berlin"]).await.unwrap(), 1);
    // Never reached
    assert_eq!(
        repo.count_by_sorted_branch(BRANCH_LOCATION_SORTBY_PRICE, &["Berlin"])
            .await
            .unwrap(),
        0
    );

    // Retrying once the backend recovers completes the index
    backend.heal();
    repo.update(&p).await.unwrap();
    assert_eq!(
        repo.count_by_branch(BRANCH_LOCATION_ROOMNUMBER, &["Berlin", "2"])
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        repo.count_by_sorted_branch(BRANCH_LOCATION_SORTBY_PRICE, &["Berlin"])
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_orphaned_index_entries() {
    let backend = Arc::new(InMemoryBackend::new());
    let lenient = property_repository(backend.clone());
    lenient
        .add(&mut property("p1", Location::London, 700, 2))
        .await
        .unwrap();
    backend.key_delete("Property:data:p1").await.unwrap();

    assert!(lenient
        .get_by_branch(BRANCH_LOCATION, &["London"])
        .await
        .unwrap()
        .is_empty());

    let strict = property_repository_with(
        backend,
        RepositoryConfig {
            missing_record_policy: MissingRecordPolicy::Error,
            ..RepositoryConfig::default()
        },
    );
    assert!(matches!(
        strict.get_by_branch(BRANCH_LOCATION, &["London"]).await,
        Err(Error::RecordNotFound { .. })
    ));
}

#[tokio::test]
async fn test_repository_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keybranch.toml");
    std::fs::write(
        &path,
        "evict_stale_entries = false\nmissing_record_policy = \"error\"\n",
    )
    .unwrap();

    let config = RepositoryConfig::from_file(&path).unwrap();
    let repo = property_repository_with(Arc::new(InMemoryBackend::new()), config);
    assert!(!repo.config().evict_stale_entries);
    assert_eq!(repo.config().missing_record_policy, MissingRecordPolicy::Error);
    assert!(repo.config().assign_missing_ids);
}
