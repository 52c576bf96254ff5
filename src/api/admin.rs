use crate::{
    auth::AdminOnly,
    club::{
        registry::{self, StatusChanged},
        Reply,
    },
    error::AppResult,
    store::Store,
};
use axum::{extract::Path, routing::post, Extension, Json, Router};

async fn activate(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
    AdminOnly(_): AdminOnly,
) -> AppResult<Json<Reply<StatusChanged>>> {
    Ok(Json(registry::activate(&store, club_id).await?))
}

async fn pause(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
    AdminOnly(_): AdminOnly,
) -> AppResult<Json<Reply<StatusChanged>>> {
    Ok(Json(registry::pause(&store, club_id).await?))
}

pub fn app() -> Router {
    Router::new()
        .route("/:club_id/activate", post(activate))
        .route("/:club_id/pause", post(pause))
}
