//! Joining, leaving and banning.

mod common;

use club_hub::{
    club::{membership, registry},
    error::ErrorKind,
    models::{FundingType, JoinMode, MemberStatus},
    store::Store,
};
use common::*;

#[tokio::test]
async fn join_mode_decides_admission() {
    let store = Store::memory();
    let open = free_club(&store, "open", 10).await;
    let gated = registry::create_club(
        &store,
        11,
        club_request("gated", JoinMode::Approval, FundingType::Free),
    )
    .await
    .unwrap()
    .data
    .club;

    let reply = membership::join(&store, open.id, REGION.to_string(), 20).await.unwrap();
    assert_eq!(reply.message, "joined the club");
    assert_eq!(reply.data.status, MemberStatus::Join);

    let reply = membership::join(&store, gated.id, REGION.to_string(), 20).await.unwrap();
    assert_eq!(reply.message, "applied to join the club");
    assert_eq!(reply.data.status, MemberStatus::Wait);
}

#[tokio::test]
async fn join_rejects_other_regions_duplicates_and_unknown_clubs() {
    let store = Store::memory();
    let club = free_club(&store, "open", 10).await;

    let err = membership::join(&store, club.id, "busan".to_string(), 20)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    membership::join(&store, club.id, REGION.to_string(), 20).await.unwrap();
    let err = membership::join(&store, club.id, REGION.to_string(), 20)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = membership::join(&store, 999, REGION.to_string(), 20)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn leaving_cancels_requests_and_memberships_but_not_leadership() {
    let store = Store::memory();
    let gated = registry::create_club(
        &store,
        10,
        club_request("gated", JoinMode::Approval, FundingType::Free),
    )
    .await
    .unwrap()
    .data
    .club;
    membership::join(&store, gated.id, REGION.to_string(), 20).await.unwrap();

    let reply = membership::leave(&store, gated.id, 20).await.unwrap();
    assert_eq!(reply.message, "the join request has been cancelled");

    let err = membership::leave(&store, gated.id, 20).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = membership::leave(&store, gated.id, 10).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let open = free_club(&store, "open", 11).await;
    join_all(&store, open.id, [21]).await;
    let reply = membership::leave(&store, open.id, 21).await.unwrap();
    assert_eq!(reply.message, "left the club");
}

#[tokio::test]
async fn ban_removes_the_member_and_records_the_ban() {
    let store = Store::memory();
    let club = free_club(&store, "open", 10).await;
    join_all(&store, club.id, [20, 21]).await;

    let ban = membership::ban(&store, club.id, 20, &user(10)).await.unwrap().data;
    assert_eq!(ban.banned_user_id, 20);

    let members = membership::list_members(&store, club.id).await.unwrap().data;
    assert_eq!(members.iter().map(|m| m.user_id).collect::<Vec<_>>(), vec![10, 21]);
    let banned = membership::list_banned(&store, club.id).await.unwrap().data;
    assert_eq!(banned.iter().map(|b| b.banned_user_id).collect::<Vec<_>>(), vec![20]);
}

#[tokio::test]
async fn ban_is_reserved_to_the_leader_and_cannot_target_them() {
    let store = Store::memory();
    let club = free_club(&store, "open", 10).await;
    join_all(&store, club.id, [20, 21]).await;

    let err = membership::ban(&store, club.id, 21, &user(20)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = membership::ban(&store, club.id, 10, &user(10)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = membership::ban(&store, club.id, 99, &user(10)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // Nothing was written by the failed attempts.
    let banned = membership::list_banned(&store, club.id).await.unwrap();
    assert!(banned.data.is_empty());
    assert_eq!(membership::list_members(&store, club.id).await.unwrap().data.len(), 3);
}

#[tokio::test]
async fn a_banned_user_may_apply_again_but_not_be_banned_twice() {
    let store = Store::memory();
    let club = free_club(&store, "open", 10).await;
    join_all(&store, club.id, [20]).await;
    membership::ban(&store, club.id, 20, &user(10)).await.unwrap();

    membership::join(&store, club.id, REGION.to_string(), 20).await.unwrap();
    let err = membership::ban(&store, club.id, 20, &user(10)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // The refused ban leaves the new membership in place.
    let members = membership::list_members(&store, club.id).await.unwrap().data;
    assert!(members.iter().any(|m| m.user_id == 20));
}

#[tokio::test]
async fn member_listing_needs_an_existing_club() {
    let store = Store::memory();
    let err = membership::list_members(&store, 404).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let banned = membership::list_banned(&store, 404).await.unwrap();
    assert_eq!(banned.message, "nobody has been banned from the club");
}
