use crate::{
    auth::Identity,
    club::{
        schedule::{self, ClubSchedules, CreateSchedule, UpdateSchedule},
        Reply,
    },
    error::AppResult,
    models::{Attendance, Schedule},
    store::Store,
};
use axum::{
    extract::Path,
    routing::{get, post},
    Extension, Json, Router,
};

async fn create(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
    identity: Identity,
    Json(req): Json<CreateSchedule>,
) -> AppResult<Json<Reply<Schedule>>> {
    Ok(Json(
        schedule::create_schedule(&store, club_id, identity.user_id, req).await?,
    ))
}

async fn list(
    Extension(store): Extension<Store>,
    Path(club_id): Path<i32>,
    identity: Identity,
) -> AppResult<Json<Reply<ClubSchedules>>> {
    Ok(Json(
        schedule::list_schedules(&store, club_id, identity.user_id).await?,
    ))
}

async fn apply(
    Extension(store): Extension<Store>,
    Path((club_id, schedule_id)): Path<(i32, i32)>,
    identity: Identity,
) -> AppResult<Json<Reply<Attendance>>> {
    Ok(Json(
        schedule::apply_schedule(&store, club_id, schedule_id, identity.user_id).await?,
    ))
}

async fn edit(
    Extension(store): Extension<Store>,
    Path((club_id, schedule_id)): Path<(i32, i32)>,
    identity: Identity,
    Json(req): Json<UpdateSchedule>,
) -> AppResult<Json<Reply<Schedule>>> {
    Ok(Json(
        schedule::update_schedule(&store, club_id, schedule_id, identity.user_id, req).await?,
    ))
}

async fn remove(
    Extension(store): Extension<Store>,
    Path((club_id, schedule_id)): Path<(i32, i32)>,
    identity: Identity,
) -> AppResult<Json<Reply<Schedule>>> {
    Ok(Json(
        schedule::delete_schedule(&store, club_id, schedule_id, identity.user_id).await?,
    ))
}

// The club id only scopes the URL; attendance is keyed by schedule.
async fn attendees(
    Extension(store): Extension<Store>,
    Path((_club_id, schedule_id)): Path<(i32, i32)>,
    _identity: Identity,
) -> AppResult<Json<Reply<Vec<Attendance>>>> {
    Ok(Json(schedule::list_attendees(&store, schedule_id).await?))
}

async fn attended(
    Extension(store): Extension<Store>,
    identity: Identity,
) -> AppResult<Json<Reply<Vec<Schedule>>>> {
    Ok(Json(
        schedule::attended_schedules(&store, identity.user_id).await?,
    ))
}

pub fn app() -> Router {
    Router::new()
        .route("/me/schedules", get(attended))
        .route("/:club_id/schedule", get(list).post(create))
        .route(
            "/:club_id/schedule/:schedule_id",
            post(apply).patch(edit).delete(remove),
        )
        .route("/:club_id/schedule/:schedule_id/members", get(attendees))
}
