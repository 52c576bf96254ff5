//! Commit and rollback behaviour of the in-memory transaction coordinator.

mod common;

use club_hub::{
    error::{AppError, AppResult, ErrorKind},
    models::{ClubMember, MemberStatus},
    store::{ClubFilter, Store, Tx},
};
use common::*;
use std::time::Duration;

async fn clubs_named(store: &Store, name: &str) -> usize {
    let filter = ClubFilter {
        name_contains: Some(name.to_string()),
        ..Default::default()
    };
    store
        .read(move |tx| Box::pin(async move { tx.list_clubs(filter).await }))
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn an_error_after_writes_discards_every_write() {
    let store = Store::memory();

    let err = store
        .atomically(|tx| {
            Box::pin(async move {
                let club = tx.insert_club(club_row("ghosts", 10)).await?;
                tx.insert_member(ClubMember {
                    club_id: club.id,
                    user_id: 10,
                    status: MemberStatus::Join,
                    joined_at: start(),
                })
                .await?;
                Err::<(), _>(AppError::from(ErrorKind::Conflict, "refused after writing"))
            })
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(clubs_named(&store, "ghosts").await, 0);
    let memberships = store
        .read(|tx| Box::pin(async move { tx.list_memberships(10).await }))
        .await
        .unwrap();
    assert!(memberships.is_empty());
}

#[tokio::test]
async fn an_ok_result_commits() {
    let store = Store::memory();
    store
        .atomically(|tx| {
            Box::pin(async move {
                tx.insert_club(club_row("keepers", 10)).await?;
                Ok(())
            })
        })
        .await
        .unwrap();
    assert_eq!(clubs_named(&store, "keepers").await, 1);
}

#[tokio::test]
async fn an_abandoned_transaction_commits_nothing_and_blocks_nobody() {
    let store = Store::memory();

    let abandoned = store.atomically(|tx| {
        Box::pin(async move {
            tx.insert_club(club_row("abandoned", 10)).await?;
            futures::future::pending::<AppResult<()>>().await
        })
    });
    assert!(tokio::time::timeout(Duration::from_millis(100), abandoned)
        .await
        .is_err());

    let next = tokio::time::timeout(Duration::from_secs(5), free_club(&store, "after", 11))
        .await
        .expect("the store is still usable");
    assert_eq!(next.name, "after");
    assert_eq!(clubs_named(&store, "abandoned").await, 0);
}
