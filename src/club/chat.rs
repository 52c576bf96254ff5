//! The one chat room each club owns, and who is in it.
//!
//! Room participation has its own lifecycle: leaving the room does not leave
//! the club, and leaving the club does not leave the room.

use super::{active_member, existing_club, now, Reply};
use crate::{
    error::{AppError, AppResult, ErrorKind},
    models::{ChatRoom, ChatRoomMember},
    store::{Store, Tx},
};
use tracing::info;

/// Any membership row counts, pending or admitted.
async fn club_member(tx: &mut dyn Tx, club_id: i32, user_id: i32) -> AppResult<()> {
    if tx.find_member(club_id, user_id).await?.is_none() {
        return Err(AppError::from(
            ErrorKind::Forbidden,
            "the user is not a member of the club",
        ));
    }
    Ok(())
}

async fn provisioned_room(tx: &mut dyn Tx, club_id: i32) -> AppResult<ChatRoom> {
    tx.find_chat_room(club_id).await?.ok_or_else(|| {
        AppError::from(ErrorKind::NotFound, "the club has no chat room yet")
    })
}

/// Only admitted members may look the room up.
pub async fn get_chat_room(
    store: &Store,
    club_id: i32,
    user_id: i32,
) -> AppResult<Reply<ChatRoom>> {
    let room = store
        .read(move |tx| {
            Box::pin(async move {
                existing_club(tx, club_id).await?;
                active_member(tx, club_id, user_id).await?;
                provisioned_room(tx, club_id).await
            })
        })
        .await?;
    Ok(Reply::new("returning the club chat room", room))
}

pub async fn join_chat_room(
    store: &Store,
    club_id: i32,
    user_id: i32,
) -> AppResult<Reply<ChatRoomMember>> {
    let member = store
        .atomically(move |tx| {
            Box::pin(async move {
                existing_club(tx, club_id).await?;
                club_member(tx, club_id, user_id).await?;
                let room = provisioned_room(tx, club_id).await?;
                if tx.find_chat_member(room.id, user_id).await?.is_some() {
                    return Err(AppError::from(
                        ErrorKind::Conflict,
                        "the user is already in the chat room",
                    ));
                }
                tx.insert_chat_member(ChatRoomMember {
                    room_id: room.id,
                    user_id,
                    joined_at: now(),
                })
                .await
            })
        })
        .await?;

    info!(club_id, user_id, room_id = member.room_id, "joined club chat room");
    Ok(Reply::new("joined the club chat room", member))
}

pub async fn leave_chat_room(
    store: &Store,
    club_id: i32,
    user_id: i32,
) -> AppResult<Reply<ChatRoomMember>> {
    let member = store
        .atomically(move |tx| {
            Box::pin(async move {
                existing_club(tx, club_id).await?;
                club_member(tx, club_id, user_id).await?;
                let room = provisioned_room(tx, club_id).await?;
                let member = tx.find_chat_member(room.id, user_id).await?.ok_or_else(|| {
                    AppError::from(ErrorKind::NotFound, "the user is not in the chat room")
                })?;
                if tx.delete_chat_member(room.id, user_id).await? == 0 {
                    return Err(AppError::from(
                        ErrorKind::Internal,
                        "failed to leave the chat room",
                    ));
                }
                Ok(member)
            })
        })
        .await?;

    info!(club_id, user_id, room_id = member.room_id, "left club chat room");
    Ok(Reply::new("left the club chat room", member))
}
