use crate::{
    auth::Identity,
    club::{
        membership,
        registry::{
            self, CategoryClub, ClubCreated, ClubProfile, ClubStatusView, CreateClub,
            RegionalClubs, UpdateClub,
        },
        Reply,
    },
    error::AppResult,
    models::{Club, ClubBan, ClubMember, ClubStatus, FundingType},
    store::Store,
};
use axum::{
    extract::{Path, Query},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct TypeQuery {
    #[serde(rename = "type")]
    funding_type: FundingType,
}

#[derive(Deserialize)]
struct StatusQuery {
    #[serde(rename = "type")]
    status: ClubStatus,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    keyword: String,
}

async fn list(
    Extension(store): Extension<Store>,
    identity: Identity,
) -> AppResult<Json<Reply<RegionalClubs>>> {
    Ok(Json(registry::list_by_region(&store, &identity).await?))
}

async fn create(
    Extension(store): Extension<Store>,
    identity: Identity,
    Json(req): Json<CreateClub>,
) -> AppResult<Json<Reply<ClubCreated>>> {
    Ok(Json(
        registry::create_club(&store, identity.user_id, req).await?,
    ))
}

async fn joined(
    Extension(store): Extension<Store>,
    identity: Identity,
) -> AppResult<Json<Reply<Vec<Club>>>> {
    Ok(Json(registry::joined_clubs(&store, identity.user_id).await?))
}

async fn operated(
    Extension(store): Extension<Store>,
    identity: Identity,
) -> AppResult<Json<Reply<Vec<Club>>>> {
    Ok(Json(
        registry::operated_clubs(&store, identity.user_id).await?,
    ))
}

async fn by_type(
    Extension(store): Extension<Store>,
    Query(query): Query<TypeQuery>,
) -> AppResult<Json<Reply<Vec<Club>>>> {
    Ok(Json(registry::list_by_type(&store, query.funding_type).await?))
}

async fn by_status(
    Extension(store): Extension<Store>,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<Reply<Vec<Club>>>> {
    Ok(Json(registry::list_by_status(&store, query.status).await?))
}

async fn search(
    Extension(store): Extension<Store>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Reply<Vec<Club>>>> {
    Ok(Json(registry::search(&store, &query.keyword).await?))
}

async fn by_category(
    Extension(store): Extension<Store>,
    Path(category_id): Path<i32>,
    identity: Identity,
) -> AppResult<Json<Reply<Vec<CategoryClub>>>> {
    Ok(Json(
        registry::list_by_category(&store, identity.region, category_id).await?,
    ))
}

async fn info(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
) -> AppResult<Json<Reply<ClubProfile>>> {
    Ok(Json(registry::get_club(&store, club_id).await?))
}

async fn edit(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
    identity: Identity,
    Json(req): Json<UpdateClub>,
) -> AppResult<Json<Reply<Club>>> {
    Ok(Json(
        registry::update_club(&store, &identity, club_id, req).await?,
    ))
}

async fn remove(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
    identity: Identity,
) -> AppResult<Json<Reply<Club>>> {
    Ok(Json(registry::delete_club(&store, &identity, club_id).await?))
}

async fn status(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
) -> AppResult<Json<Reply<ClubStatusView>>> {
    Ok(Json(registry::club_status(&store, club_id).await?))
}

async fn members(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
) -> AppResult<Json<Reply<Vec<ClubMember>>>> {
    Ok(Json(membership::list_members(&store, club_id).await?))
}

async fn banned(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
) -> AppResult<Json<Reply<Vec<ClubBan>>>> {
    Ok(Json(membership::list_banned(&store, club_id).await?))
}

async fn ban(
    Extension(store): Extension<Store>,
    Path((club_id, user_id)): Path<(i32, i32)>,
    identity: Identity,
) -> AppResult<Json<Reply<ClubBan>>> {
    Ok(Json(
        membership::ban(&store, club_id, user_id, &identity).await?,
    ))
}

async fn join(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
    identity: Identity,
) -> AppResult<Json<Reply<ClubMember>>> {
    Ok(Json(
        membership::join(&store, club_id, identity.region, identity.user_id).await?,
    ))
}

async fn leave(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
    identity: Identity,
) -> AppResult<Json<Reply<ClubMember>>> {
    Ok(Json(
        membership::leave(&store, club_id, identity.user_id).await?,
    ))
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/me", get(joined))
        .route("/me/operate", get(operated))
        .route("/type", get(by_type))
        .route("/status", get(by_status))
        .route("/search", get(search))
        .route("/category/:category_id", get(by_category))
        .route("/:club_id", get(info).patch(edit).delete(remove))
        .route("/:club_id/status", get(status))
        .route("/:club_id/members", get(members))
        .route("/:club_id/members/ban", get(banned))
        .route("/:club_id/members/:user_id", delete(ban))
        .route("/:club_id/join", post(join))
        .route("/:club_id/leave", delete(leave))
        .merge(super::schedule::app())
        .merge(super::chat::app())
        .merge(super::admin::app())
}
