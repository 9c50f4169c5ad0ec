//! Racing claims on a multi-threaded runtime.

use std::sync::Arc;

use content_access_kernel::{
    ClaimCoordinator, ClaimOutcome, Content, ContentStore, ContentType, InMemoryContentStore,
    UserId, Viewer, Visibility,
};
use uuid::Uuid;

const RACERS: u128 = 16;

fn user(id: u128) -> UserId {
    UserId::new(Uuid::from_u128(id))
}

async fn setup() -> (Arc<ClaimCoordinator<InMemoryContentStore>>, Content) {
    let store = Arc::new(InMemoryContentStore::new());
    let item = Content::unclaimed("Jane Doe", "Contested", ContentType::Blog, Visibility::Public);
    store.insert(item.clone()).await.unwrap();
    (Arc::new(ClaimCoordinator::new(store)), item)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_guarded_claims_have_one_winner() {
    let (coordinator, item) = setup().await;
    let id = item.id;

    let handles: Vec<_> = (1..=RACERS)
        .map(|n| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.claim_content(&id, &user(n), false).await })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            ClaimOutcome::Claimed { content } => winners.push(*content),
            ClaimOutcome::Rejected { content_id, .. } => assert_eq!(content_id, id),
        }
    }

    assert_eq!(winners.len(), 1);
    let winner = &winners[0];
    assert_eq!(winner.version, item.version + 1);

    let row = coordinator.store().get_raw(&id).unwrap();
    assert_eq!(row.owner_id, winner.owner_id);
    assert_eq!(row.version, item.version + 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_force_claims_each_bump_version() {
    let (coordinator, item) = setup().await;
    let id = item.id;

    let handles: Vec<_> = (1..=RACERS)
        .map(|n| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.claim_content(&id, &user(n), true).await })
        })
        .collect();

    let mut versions = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        versions.push(outcome.content().map(|c| c.version).unwrap());
    }
    versions.sort_unstable();

    let expected: Vec<i64> = (1..=RACERS as i64).map(|n| item.version + n).collect();
    assert_eq!(versions, expected);

    let row = coordinator.store().get_raw(&id).unwrap();
    assert_eq!(row.version, item.version + RACERS as i64);
    assert!(row.is_claimed);

    // Last write wins; a late guarded claim still fails.
    let late = coordinator.claim_content(&id, &user(999), false).await.unwrap();
    assert!(!late.is_claimed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_during_claims_never_see_partial_rows() {
    let (coordinator, item) = setup().await;
    let id = item.id;
    let store_reader = Arc::clone(&coordinator);

    let reader = tokio::spawn(async move {
        for _ in 0..200 {
            if let Some(row) = store_reader
                .store()
                .find_by_id_for_viewer(&id, &Viewer::Anonymous)
                .await
                .unwrap()
            {
                // Claimed rows always carry an owner and a claim time.
                assert_eq!(row.is_claimed, row.owner_id.is_some());
                assert_eq!(row.is_claimed, row.claimed_at.is_some());
            }
            tokio::task::yield_now().await;
        }
    });

    let writers: Vec<_> = (1..=RACERS)
        .map(|n| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.claim_content(&id, &user(n), n % 2 == 0).await })
        })
        .collect();

    for writer in writers {
        writer.await.unwrap().unwrap();
    }
    reader.await.unwrap();
}
