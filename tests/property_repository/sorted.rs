//! Sorted branch ordering, ranges and paging

use std::collections::BTreeSet;
use std::sync::Arc;

use keybranch::{InMemoryBackend, Page, ScoreRange};
use proptest::prelude::*;

use crate::common::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Add one London property per price, `p<index>`, and return the
/// `(price, id)` pairs
async fn seed(repo: &keybranch::Repository<Property>, prices: &[i64]) -> Vec<(i64, String)> {
    let mut seeded = Vec::new();
    for (i, price) in prices.iter().enumerate() {
        let mut p = property(&format!("p{i}"), Location::London, *price, 2);
        repo.add(&mut p).await.unwrap();
        seeded.push((*price, p.id));
    }
    seeded
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn sorted_branch_returns_ascending_scores(prices in prop::collection::btree_set(0i64..1_000_000, 1..25)) {
        let prices: Vec<i64> = prices.into_iter().rev().collect();
        let (expected, found) = runtime().block_on(async {
            let repo = property_repository(Arc::new(InMemoryBackend::new()));
            let mut seeded = seed(&repo, &prices).await;
            seeded.sort();
            let found = repo
                .get_by_sorted_branch(BRANCH_LOCATION_SORTBY_PRICE, &["London"])
                .await
                .unwrap();
            (seeded, found)
        });

        let expected_ids: Vec<&str> = expected.iter().map(|(_, id)| id.as_str()).collect();
        prop_assert_eq!(ids(&found), expected_ids);
        prop_assert!(found.windows(2).all(|w| w[0].price <= w[1].price));
    }

    #[test]
    fn sorted_range_is_inclusive_subset(
        prices in prop::collection::btree_set(0i64..10_000, 1..25),
        from in 0i64..10_000,
        width in 0i64..5_000,
    ) {
        let prices: Vec<i64> = prices.into_iter().collect();
        let to = from + width;
        let (expected, found, counted) = runtime().block_on(async {
            let repo = property_repository(Arc::new(InMemoryBackend::new()));
            let seeded = seed(&repo, &prices).await;
            let found = repo
                .get_by_sorted_branch_range(BRANCH_LOCATION_SORTBY_PRICE, from as f64, to as f64, &["London"])
                .await
                .unwrap();
            let counted = repo
                .count_by_sorted_branch_range(BRANCH_LOCATION_SORTBY_PRICE, from as f64, to as f64, &["London"])
                .await
                .unwrap();
            let expected: BTreeSet<(i64, String)> = seeded
                .into_iter()
                .filter(|(price, _)| (from..=to).contains(price))
                .collect();
            (expected, found, counted)
        });

        let expected_ids: Vec<&str> = expected.iter().map(|(_, id)| id.as_str()).collect();
        prop_assert_eq!(ids(&found), expected_ids);
        prop_assert_eq!(counted as usize, expected.len());
    }
}

#[tokio::test]
async fn test_from_bound_and_paging() {
    let repo = property_repository(Arc::new(InMemoryBackend::new()));
    seed(&repo, &[500, 100, 400, 200, 300]).await;

    let from_300 = repo
        .get_by_sorted_branch_from(BRANCH_LOCATION_SORTBY_PRICE, 300.0, &["London"])
        .await
        .unwrap();
    assert_eq!(ids(&from_300), vec!["p4", "p2", "p0"]);
    assert_eq!(
        repo.count_by_sorted_branch_from(BRANCH_LOCATION_SORTBY_PRICE, 300.0, &["London"])
            .await
            .unwrap(),
        3
    );

    let second_page = repo
        .get_by_sorted_branch_page(BRANCH_LOCATION_SORTBY_PRICE, 0.0, 1000.0, 2, 2, &["London"])
        .await
        .unwrap();
    assert_eq!(ids(&second_page), vec!["p4", "p2"]);

    let past_end = repo
        .get_by_score(
            BRANCH_LOCATION_SORTBY_PRICE,
            ScoreRange::all(),
            Some(Page::new(10, 5)),
            &["London"],
        )
        .await
        .unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn test_empty_range_returns_nothing() {
    let repo = property_repository(Arc::new(InMemoryBackend::new()));
    seed(&repo, &[100, 200]).await;

    let inverted = repo
        .get_by_sorted_branch_range(BRANCH_LOCATION_SORTBY_PRICE, 200.0, 100.0, &["London"])
        .await
        .unwrap();
    assert!(inverted.is_empty());
    assert_eq!(
        repo.count_by_score(BRANCH_LOCATION_SORTBY_PRICE, ScoreRange::new(500.0, 900.0), &["London"])
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_sort_by_last_update_time() {
    let repo = property_repository(Arc::new(InMemoryBackend::new()));
    for (id, minutes) in [("late", 90), ("early", 5), ("middle", 30)] {
        let mut p = property(id, Location::Berlin, 100, 1);
        p.last_update = Some(updated_at(minutes));
        repo.add(&mut p).await.unwrap();
    }

    let ordered = repo
        .get_by_sorted_branch(BRANCH_LOCATION_SORTBY_LASTUPDATEDATE, &["Berlin"])
        .await
        .unwrap();
    assert_eq!(ids(&ordered), vec!["early", "middle", "late"]);

    let from = updated_at(10).unix_millis() as f64;
    let to = updated_at(60).unix_millis() as f64;
    let window = repo
        .get_by_sorted_branch_range(BRANCH_LOCATION_ROOMNUMBER_LASTUPDATEDATE, from, to, &["Berlin", "1"])
        .await
        .unwrap();
    assert_eq!(ids(&window), vec!["middle"]);
}

#[tokio::test]
async fn test_price_change_rescores() {
    let repo = property_repository(Arc::new(InMemoryBackend::new()));
    seed(&repo, &[100, 200, 300]).await;

    let mut cheapest = repo.get_by_id("p0").await.unwrap().unwrap();
    cheapest.price = 1000;
    repo.update(&cheapest).await.unwrap();

    let ordered = repo
        .get_by_sorted_branch(BRANCH_LOCATION_SORTBY_PRICE, &["London"])
        .await
        .unwrap();
    assert_eq!(ids(&ordered), vec!["p1", "p2", "p0"]);
    assert_eq!(ordered[2].price, 1000);
}

#[tokio::test]
async fn test_sorted_category_query() {
    let repo = property_repository(Arc::new(InMemoryBackend::new()));
    seed(&repo, &[300, 100]).await;

    let by_category = repo
        .get_by_category(BRANCH_LOCATION_ROOMNUMBER_SORTBY_PRICE, &["London", "2"])
        .await
        .unwrap();
    assert_eq!(ids(&by_category), vec!["p1", "p0"]);
    assert_eq!(
        repo.count_by_category(BRANCH_LOCATION_ROOMNUMBER_SORTBY_PRICE, &["London", "2"])
            .await
            .unwrap(),
        2
    );
}
