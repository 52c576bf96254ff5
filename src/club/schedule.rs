//! Club schedules and their capacity-bounded attendance.

use super::{active_member, ensure_leader, existing_club, now, Reply};
use crate::{
    error::{AppError, AppResult, ErrorKind},
    models::*,
    store::{Store, Tx},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchedule {
    pub title: String,
    pub content: Option<String>,
    pub place: String,
    /// A positive price makes the schedule `PAID`; zero is treated as free.
    pub price: Option<i32>,
    pub max_attendee: i32,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
}

fn check_capacity(max_attendee: i32) -> AppResult<()> {
    if max_attendee <= 0 {
        return Err(AppError::from(
            ErrorKind::BadRequest,
            "the maximum number of attendees must be positive",
        ));
    }
    Ok(())
}

fn check_period(start_date: NaiveDateTime, end_date: NaiveDateTime) -> AppResult<()> {
    if end_date < start_date {
        return Err(AppError::from(
            ErrorKind::BadRequest,
            "a schedule cannot end before it starts",
        ));
    }
    Ok(())
}

pub async fn create_schedule(
    store: &Store,
    club_id: i32,
    requester_id: i32,
    req: CreateSchedule,
) -> AppResult<Reply<Schedule>> {
    let schedule = store
        .atomically(move |tx| {
            Box::pin(async move {
                let club = existing_club(tx, club_id).await?;
                ensure_leader(&club, requester_id, "create schedules")?;
                check_capacity(req.max_attendee)?;
                check_period(req.start_date, req.end_date)?;

                let price = match req.price {
                    Some(p) if p < 0 => {
                        return Err(AppError::from(
                            ErrorKind::BadRequest,
                            "the price must not be negative",
                        ))
                    }
                    Some(p) if p > 0 => Some(p),
                    _ => None,
                };
                if price.is_some() && club.funding_type == FundingType::Free {
                    return Err(AppError::from(
                        ErrorKind::BadRequest,
                        "only paid clubs can host priced schedules",
                    ));
                }

                tx.insert_schedule(NewSchedule {
                    club_id,
                    title: req.title,
                    content: req.content,
                    place: req.place,
                    price,
                    funding_type: if price.is_some() {
                        FundingType::Paid
                    } else {
                        FundingType::Free
                    },
                    max_attendee: req.max_attendee,
                    start_date: req.start_date,
                    end_date: req.end_date,
                })
                .await
            })
        })
        .await?;

    info!(club_id, schedule_id = schedule.id, "schedule created");
    let message = match schedule.funding_type {
        FundingType::Paid => "paid schedule created",
        FundingType::Free => "schedule created",
    };
    Ok(Reply::new(message, schedule))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubSchedules {
    pub club_name: String,
    pub schedules: Vec<Schedule>,
}

/// Schedules of a club, visible to its admitted members only.
pub async fn list_schedules(
    store: &Store,
    club_id: i32,
    user_id: i32,
) -> AppResult<Reply<ClubSchedules>> {
    let listing = store
        .read(move |tx| {
            Box::pin(async move {
                let club = existing_club(tx, club_id).await?;
                active_member(tx, club_id, user_id).await?;
                Ok(ClubSchedules {
                    club_name: club.name,
                    schedules: tx.list_schedules(vec![club_id]).await?,
                })
            })
        })
        .await?;

    let message = if listing.schedules.is_empty() {
        "the club has no schedules"
    } else {
        "returning every schedule of the club"
    };
    Ok(Reply::new(message, listing))
}

/// Takes a seat in a schedule.
///
/// The seat count is read while the schedule row is locked, so two members
/// racing for the last seat cannot both get it.
#[instrument(skip(store))]
pub async fn apply_schedule(
    store: &Store,
    club_id: i32,
    schedule_id: i32,
    user_id: i32,
) -> AppResult<Reply<Attendance>> {
    let attendance = store
        .atomically(move |tx| {
            Box::pin(async move {
                existing_club(tx, club_id).await?;
                let schedule = tx.lock_schedule(schedule_id).await?.ok_or_else(|| {
                    AppError::from(ErrorKind::NotFound, "the schedule does not exist")
                })?;
                if schedule.club_id != club_id {
                    return Err(AppError::from(
                        ErrorKind::BadRequest,
                        "the schedule does not belong to the club",
                    ));
                }
                active_member(tx, club_id, user_id).await?;
                if tx.find_attendance(schedule_id, user_id).await?.is_some() {
                    return Err(AppError::from(
                        ErrorKind::Conflict,
                        "already attending the schedule",
                    ));
                }
                if tx.count_attendees(schedule_id).await? >= i64::from(schedule.max_attendee) {
                    return Err(AppError::from(
                        ErrorKind::BadRequest,
                        "the schedule is already full",
                    ));
                }

                tx.insert_attendance(Attendance {
                    schedule_id,
                    member_id: user_id,
                    status: AttendStatus::Attend,
                    applied_at: now(),
                })
                .await
            })
        })
        .await?;

    info!("schedule seat taken");
    Ok(Reply::new("you are attending the schedule", attendance))
}

/// Allow-list of schedule fields a leader may edit.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchedule {
    pub title: Option<String>,
    pub content: Option<String>,
    pub place: Option<String>,
    pub max_attendee: Option<i32>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

impl From<UpdateSchedule> for ScheduleChanges {
    fn from(req: UpdateSchedule) -> Self {
        ScheduleChanges {
            title: req.title,
            content: req.content,
            place: req.place,
            max_attendee: req.max_attendee,
            start_date: req.start_date,
            end_date: req.end_date,
        }
    }
}

/// Locks a schedule and checks that `user_id` leads the club owning it.
async fn led_schedule(
    tx: &mut dyn Tx,
    club_id: i32,
    schedule_id: i32,
    user_id: i32,
) -> AppResult<Schedule> {
    let schedule = tx
        .lock_schedule(schedule_id)
        .await?
        .filter(|s| s.club_id == club_id)
        .ok_or_else(|| AppError::from(ErrorKind::NotFound, "the schedule does not exist"))?;
    let club = existing_club(tx, club_id).await?;
    ensure_leader(&club, user_id, "manage schedules")?;
    Ok(schedule)
}

pub async fn update_schedule(
    store: &Store,
    club_id: i32,
    schedule_id: i32,
    user_id: i32,
    req: UpdateSchedule,
) -> AppResult<Reply<Schedule>> {
    let changes = ScheduleChanges::from(req);
    let schedule = store
        .atomically(move |tx| {
            Box::pin(async move {
                let mut merged = led_schedule(tx, club_id, schedule_id, user_id).await?;

                if let Some(max_attendee) = changes.max_attendee {
                    check_capacity(max_attendee)?;
                    if i64::from(max_attendee) < tx.count_attendees(schedule_id).await? {
                        return Err(AppError::from(
                            ErrorKind::Forbidden,
                            "capacity cannot drop below the current number of attendees",
                        ));
                    }
                }
                changes.apply(&mut merged);
                check_period(merged.start_date, merged.end_date)?;

                tx.update_schedule(schedule_id, changes)
                    .await?
                    .ok_or_else(|| {
                        AppError::from(ErrorKind::Internal, "failed to update the schedule")
                    })
            })
        })
        .await?;

    info!(club_id, schedule_id, "schedule updated");
    Ok(Reply::new("the schedule has been updated", schedule))
}

/// Deletes a free schedule together with its attendance. Paid schedules
/// represent sold seats and are never deleted.
pub async fn delete_schedule(
    store: &Store,
    club_id: i32,
    schedule_id: i32,
    user_id: i32,
) -> AppResult<Reply<Schedule>> {
    let schedule = store
        .atomically(move |tx| {
            Box::pin(async move {
                let schedule = led_schedule(tx, club_id, schedule_id, user_id).await?;
                if schedule.funding_type == FundingType::Paid {
                    return Err(AppError::from(
                        ErrorKind::Forbidden,
                        "paid schedules cannot be deleted",
                    ));
                }

                // Dependents first, then the schedule itself.
                tx.delete_attendance(schedule_id).await?;
                if tx.delete_schedule(schedule_id).await? == 0 {
                    return Err(AppError::from(
                        ErrorKind::Internal,
                        "failed to delete the schedule",
                    ));
                }
                Ok(schedule)
            })
        })
        .await?;

    info!(club_id, schedule_id, "schedule deleted");
    Ok(Reply::new("the schedule has been deleted", schedule))
}

pub async fn list_attendees(store: &Store, schedule_id: i32) -> AppResult<Reply<Vec<Attendance>>> {
    let attendees = store
        .read(move |tx| Box::pin(async move { tx.list_attendance(schedule_id).await }))
        .await?;
    Ok(Reply::listed(
        attendees,
        "returning the attendees of the schedule",
        "nobody attends the schedule yet",
    ))
}

/// Every schedule `user_id` attends, across all clubs.
pub async fn attended_schedules(store: &Store, user_id: i32) -> AppResult<Reply<Vec<Schedule>>> {
    let schedules = store
        .read(move |tx| Box::pin(async move { tx.list_schedules_attended_by(user_id).await }))
        .await?;
    Ok(Reply::listed(
        schedules,
        "returning every schedule you attend",
        "you are not attending any schedule",
    ))
}
