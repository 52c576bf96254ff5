//! Club lifecycle, admission control, schedules and the club chat bridge.
//!
//! Each operation that touches more than one row runs inside
//! [`Store::atomically`](crate::store::Store::atomically); every check it makes
//! is read through the same transaction handle as the writes that depend on it.

pub mod chat;
pub mod membership;
pub mod registry;
pub mod schedule;

use crate::{
    error::{AppError, AppResult, ErrorKind},
    models::{Club, ClubMember, MemberStatus},
    store::Tx,
};
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use std::borrow::Cow;

/// Body of every successful response: a human-readable status line plus the
/// affected record(s).
#[derive(Debug, Serialize)]
pub struct Reply<T> {
    pub message: Cow<'static, str>,
    pub data: T,
}

impl<T> Reply<T> {
    pub fn new(message: impl Into<Cow<'static, str>>, data: T) -> Self {
        Reply {
            message: message.into(),
            data,
        }
    }
}

impl<T> Reply<Vec<T>> {
    /// Lists are never an error; only the message tells an empty result apart.
    pub fn listed(items: Vec<T>, found: &'static str, empty: &'static str) -> Self {
        let message = if items.is_empty() { empty } else { found };
        Reply::new(message, items)
    }
}

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub(crate) async fn existing_club(tx: &mut dyn Tx, club_id: i32) -> AppResult<Club> {
    tx.find_club(club_id)
        .await?
        .ok_or_else(|| AppError::from(ErrorKind::NotFound, "the club does not exist"))
}

/// Like [`existing_club`], but holds the club row until the transaction ends.
pub(crate) async fn locked_club(tx: &mut dyn Tx, club_id: i32) -> AppResult<Club> {
    tx.lock_club(club_id)
        .await?
        .ok_or_else(|| AppError::from(ErrorKind::NotFound, "the club does not exist"))
}

pub(crate) fn ensure_leader(club: &Club, user_id: i32, action: &'static str) -> AppResult<()> {
    if club.leader_id != user_id {
        return Err(AppError::from(
            ErrorKind::Forbidden,
            format!("only the club leader can {action}"),
        ));
    }
    Ok(())
}

/// Fails with `Forbidden` unless `user_id` is an admitted (`JOIN`) member.
pub(crate) async fn active_member(
    tx: &mut dyn Tx,
    club_id: i32,
    user_id: i32,
) -> AppResult<ClubMember> {
    match tx.find_member(club_id, user_id).await? {
        Some(member) if member.status == MemberStatus::Join => Ok(member),
        _ => Err(AppError::from(
            ErrorKind::Forbidden,
            "the user is not a member of the club",
        )),
    }
}
