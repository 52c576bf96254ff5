use crate::{
    auth::Identity,
    club::{chat, Reply},
    error::AppResult,
    models::{ChatRoom, ChatRoomMember},
    store::Store,
};
use axum::{
    extract::Path,
    routing::{delete, get, post},
    Extension, Json, Router,
};

async fn room(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
    identity: Identity,
) -> AppResult<Json<Reply<ChatRoom>>> {
    Ok(Json(
        chat::get_chat_room(&store, club_id, identity.user_id).await?,
    ))
}

async fn join(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
    identity: Identity,
) -> AppResult<Json<Reply<ChatRoomMember>>> {
    Ok(Json(
        chat::join_chat_room(&store, club_id, identity.user_id).await?,
    ))
}

async fn leave(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
    identity: Identity,
) -> AppResult<Json<Reply<ChatRoomMember>>> {
    Ok(Json(
        chat::leave_chat_room(&store, club_id, identity.user_id).await?,
    ))
}

pub fn app() -> Router {
    Router::new()
        .route("/:club_id/chat-room", get(room))
        .route("/:club_id/chat-room/join", post(join))
        .route("/:club_id/chat-room/leave", delete(leave))
}
