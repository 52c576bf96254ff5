//! The club chat bridge.

mod common;

use club_hub::{
    club::{chat, membership, registry},
    error::ErrorKind,
    models::{FundingType, JoinMode},
    store::Store,
};
use common::*;

#[tokio::test]
async fn members_enter_and_leave_the_room() {
    let store = Store::memory();
    let club = free_club(&store, "runners", 10).await;
    join_all(&store, club.id, [20]).await;

    let room = chat::get_chat_room(&store, club.id, 20).await.unwrap().data;
    assert_eq!(room.club_id, club.id);

    let entered = chat::join_chat_room(&store, club.id, 20).await.unwrap().data;
    assert_eq!(entered.room_id, room.id);
    let err = chat::join_chat_room(&store, club.id, 20).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let left = chat::leave_chat_room(&store, club.id, 20).await.unwrap();
    assert_eq!(left.message, "left the club chat room");
    let err = chat::leave_chat_room(&store, club.id, 20).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn pending_members_may_enter_the_room_but_outsiders_may_not() {
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

    let entered = chat::join_chat_room(&store, gated.id, 20).await.unwrap().data;
    assert_eq!(entered.user_id, 20);
    chat::leave_chat_room(&store, gated.id, 20).await.unwrap();

    // Looking the room up still needs an admitted member.
    let err = chat::get_chat_room(&store, gated.id, 20).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = chat::get_chat_room(&store, gated.id, 30).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = chat::join_chat_room(&store, gated.id, 30).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = chat::join_chat_room(&store, 404, 20).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn paid_clubs_have_no_room_until_activated() {
    let store = Store::memory();
    let club = registry::create_club(
        &store,
        10,
        club_request("cooking", JoinMode::Auto, FundingType::Paid),
    )
    .await
    .unwrap()
    .data
    .club;

    let err = chat::join_chat_room(&store, club.id, 10).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    registry::activate(&store, club.id).await.unwrap();
    chat::join_chat_room(&store, club.id, 10).await.unwrap();
}

#[tokio::test]
async fn leaving_the_club_keeps_the_room_membership() {
    let store = Store::memory();
    let club = free_club(&store, "runners", 10).await;
    join_all(&store, club.id, [20]).await;
    chat::join_chat_room(&store, club.id, 20).await.unwrap();

    membership::leave(&store, club.id, 20).await.unwrap();

    // No membership row any more, so the room cannot be left through the club.
    let err = chat::leave_chat_room(&store, club.id, 20).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}
