//! Shared fixtures for the integration tests. Everything runs against the
//! in-memory store.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use club_hub::{
    auth::{Identity, Role},
    club::{
        membership,
        registry::{self, CreateClub},
        schedule::{self, CreateSchedule},
    },
    models::{Club, ClubStatus, FundingType, JoinMode, NewClub, Schedule},
    store::Store,
};

pub const REGION: &str = "seoul";

/// base64 of "club-hub-test-secret"
pub const JWT_SECRET: &str = "Y2x1Yi1odWItdGVzdC1zZWNyZXQ=";

pub fn user(user_id: i32) -> Identity {
    Identity {
        user_id,
        role: Role::User,
        region: REGION.to_string(),
        email: format!("user{user_id}@example.com"),
    }
}

pub fn admin() -> Identity {
    Identity {
        role: Role::Admin,
        ..user(1)
    }
}

pub fn club_request(name: &str, join_mode: JoinMode, funding_type: FundingType) -> CreateClub {
    CreateClub {
        name: name.to_string(),
        introduction: Some(format!("{name} meets every week")),
        region: REGION.to_string(),
        category_id: 3,
        join_mode,
        funding_type,
    }
}

/// A raw club row, for exercising the store directly.
pub fn club_row(name: &str, leader_id: i32) -> NewClub {
    NewClub {
        name: name.to_string(),
        introduction: None,
        region: REGION.to_string(),
        category_id: 3,
        leader_id,
        join_mode: JoinMode::Auto,
        funding_type: FundingType::Free,
        status: ClubStatus::Active,
        created_at: Utc::now().naive_utc(),
    }
}

/// Creates a free club with automatic admission, led by `leader_id`.
pub async fn free_club(store: &Store, name: &str, leader_id: i32) -> Club {
    registry::create_club(store, leader_id, club_request(name, JoinMode::Auto, FundingType::Free))
        .await
        .expect("create free club")
        .data
        .club
}

/// Creates a paid club and activates it.
pub async fn active_paid_club(store: &Store, name: &str, leader_id: i32) -> Club {
    let club = registry::create_club(
        store,
        leader_id,
        club_request(name, JoinMode::Auto, FundingType::Paid),
    )
    .await
    .expect("create paid club")
    .data
    .club;
    registry::activate(store, club.id).await.expect("activate club");
    club
}

pub async fn join_all(store: &Store, club_id: i32, user_ids: impl IntoIterator<Item = i32>) {
    for user_id in user_ids {
        membership::join(store, club_id, REGION.to_string(), user_id)
            .await
            .expect("join club");
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .expect("valid date")
}

pub fn schedule_request(max_attendee: i32, price: Option<i32>) -> CreateSchedule {
    CreateSchedule {
        title: "morning run".to_string(),
        content: None,
        place: "han river".to_string(),
        price,
        max_attendee,
        start_date: start(),
        end_date: start() + Duration::hours(2),
    }
}

pub async fn free_schedule(
    store: &Store,
    club_id: i32,
    leader_id: i32,
    max_attendee: i32,
) -> Schedule {
    schedule::create_schedule(store, club_id, leader_id, schedule_request(max_attendee, None))
        .await
        .expect("create schedule")
        .data
}
