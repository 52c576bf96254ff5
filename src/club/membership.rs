//! Club rosters, admission policy and the ban list.

use super::{ensure_leader, existing_club, locked_club, now, Reply};
use crate::{
    auth::Identity,
    error::{AppError, AppResult, ErrorKind},
    models::*,
    store::Store,
};
use tracing::{info, instrument};

/// Requests membership in a club from the caller's home region.
///
/// `AUTO` clubs admit immediately; any other join mode leaves the request
/// pending. A previous ban does not prevent a new request.
#[instrument(skip(store, region))]
pub async fn join(
    store: &Store,
    club_id: i32,
    region: String,
    user_id: i32,
) -> AppResult<Reply<ClubMember>> {
    let member = store
        .atomically(move |tx| {
            Box::pin(async move {
                let club = locked_club(tx, club_id).await?;
                if club.region != region {
                    return Err(AppError::from(
                        ErrorKind::BadRequest,
                        "cannot join a club in another region",
                    ));
                }
                if tx.find_member(club_id, user_id).await?.is_some() {
                    return Err(AppError::from(
                        ErrorKind::Conflict,
                        "the user has already joined or applied to the club",
                    ));
                }

                let status = match club.join_mode {
                    JoinMode::Auto => MemberStatus::Join,
                    JoinMode::Approval => MemberStatus::Wait,
                };
                tx.insert_member(ClubMember {
                    club_id,
                    user_id,
                    status,
                    joined_at: now(),
                })
                .await
            })
        })
        .await?;

    info!(status = %member.status, "membership requested");
    let message = match member.status {
        MemberStatus::Join => "joined the club",
        MemberStatus::Wait => "applied to join the club",
    };
    Ok(Reply::new(message, member))
}

/// Removes the caller's own membership, pending or admitted. The leader
/// cannot leave.
pub async fn leave(store: &Store, club_id: i32, user_id: i32) -> AppResult<Reply<ClubMember>> {
    let member = store
        .atomically(move |tx| {
            Box::pin(async move {
                let club = existing_club(tx, club_id).await?;
                let member = tx.find_member(club_id, user_id).await?.ok_or_else(|| {
                    AppError::from(ErrorKind::NotFound, "the user is not a member of the club")
                })?;
                if club.leader_id == user_id {
                    return Err(AppError::from(
                        ErrorKind::Forbidden,
                        "the club leader cannot leave the club",
                    ));
                }
                if tx.delete_member(club_id, user_id).await? == 0 {
                    return Err(AppError::from(
                        ErrorKind::Internal,
                        "failed to remove the membership",
                    ));
                }
                Ok(member)
            })
        })
        .await?;

    info!(club_id, user_id, "membership removed");
    let message = match member.status {
        MemberStatus::Wait => "the join request has been cancelled",
        MemberStatus::Join => "left the club",
    };
    Ok(Reply::new(message, member))
}

/// Removes a member and records a permanent ban, both or neither.
#[instrument(skip(store, requester), fields(requester = requester.user_id))]
pub async fn ban(
    store: &Store,
    club_id: i32,
    target_user_id: i32,
    requester: &Identity,
) -> AppResult<Reply<ClubBan>> {
    let requester_id = requester.user_id;
    let ban = store
        .atomically(move |tx| {
            Box::pin(async move {
                let club = locked_club(tx, club_id).await?;
                if tx.find_member(club_id, target_user_id).await?.is_none() {
                    return Err(AppError::from(
                        ErrorKind::NotFound,
                        "the member does not exist",
                    ));
                }
                ensure_leader(&club, requester_id, "ban members")?;
                if club.leader_id == target_user_id {
                    return Err(AppError::from(
                        ErrorKind::Forbidden,
                        "the club leader cannot ban themselves",
                    ));
                }
                if tx.find_ban(club_id, target_user_id).await?.is_some() {
                    return Err(AppError::from(
                        ErrorKind::Conflict,
                        "the user is already banned from the club",
                    ));
                }

                if tx.delete_member(club_id, target_user_id).await? == 0 {
                    return Err(AppError::from(
                        ErrorKind::Internal,
                        "failed to remove the member",
                    ));
                }
                tx.insert_ban(ClubBan {
                    club_id,
                    banned_user_id: target_user_id,
                    banned_at: now(),
                })
                .await
            })
        })
        .await?;

    info!("member banned");
    Ok(Reply::new("the member has been banned", ban))
}

pub async fn list_members(store: &Store, club_id: i32) -> AppResult<Reply<Vec<ClubMember>>> {
    let members = store
        .read(move |tx| {
            Box::pin(async move {
                existing_club(tx, club_id).await?;
                tx.list_members(vec![club_id]).await
            })
        })
        .await?;
    Ok(Reply::listed(
        members,
        "returning every member of the club",
        "the club has no members",
    ))
}

pub async fn list_banned(store: &Store, club_id: i32) -> AppResult<Reply<Vec<ClubBan>>> {
    let bans = store
        .read(move |tx| Box::pin(async move { tx.list_bans(vec![club_id]).await }))
        .await?;
    Ok(Reply::listed(
        bans,
        "returning the banned users of the club",
        "nobody has been banned from the club",
    ))
}
