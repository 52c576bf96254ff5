//! Club records and their status state machine.
//!
//! ```text
//! AWAITING --activate--> ACTIVE <--pause/activate--> PAUSE
//!     any state --leader delete--> DELETED (terminal)
//! ```
//!
//! `FREE` clubs start `ACTIVE` with a chat room; `PAID` clubs start `AWAITING`
//! and receive their chat room when an administrator activates them.

use super::{ensure_leader, existing_club, locked_club, now, Reply};
use crate::{
    auth::Identity,
    error::{AppError, AppResult, ErrorKind},
    models::*,
    store::{ClubFilter, Store, Tx},
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClub {
    pub name: String,
    pub introduction: Option<String>,
    pub region: String,
    pub category_id: i32,
    pub join_mode: JoinMode,
    pub funding_type: FundingType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubCreated {
    pub club: Club,
    pub member: ClubMember,
    pub chat_room: Option<ChatRoom>,
}

#[instrument(skip(store, req), fields(name = %req.name))]
pub async fn create_club(
    store: &Store,
    leader_id: i32,
    req: CreateClub,
) -> AppResult<Reply<ClubCreated>> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::from(
            ErrorKind::BadRequest,
            "the club name must not be empty",
        ));
    }
    if req.region.trim().is_empty() {
        return Err(AppError::from(
            ErrorKind::BadRequest,
            "the club region must not be empty",
        ));
    }

    let created = store
        .atomically(move |tx| {
            Box::pin(async move {
                tx.lock_club_name(&name).await?;
                if tx.club_name_taken(&name).await? {
                    return Err(AppError::from(
                        ErrorKind::Conflict,
                        "a club with this name already exists",
                    ));
                }

                let status = match req.funding_type {
                    FundingType::Free => ClubStatus::Active,
                    FundingType::Paid => ClubStatus::Awaiting,
                };
                let club = tx
                    .insert_club(NewClub {
                        name,
                        introduction: req.introduction,
                        region: req.region,
                        category_id: req.category_id,
                        leader_id,
                        join_mode: req.join_mode,
                        funding_type: req.funding_type,
                        status,
                        created_at: now(),
                    })
                    .await?;
                let member = tx
                    .insert_member(ClubMember {
                        club_id: club.id,
                        user_id: leader_id,
                        status: MemberStatus::Join,
                        joined_at: now(),
                    })
                    .await?;
                let chat_room = match club.funding_type {
                    FundingType::Free => Some(
                        tx.insert_chat_room(NewChatRoom {
                            club_id: club.id,
                            created_at: now(),
                        })
                        .await?,
                    ),
                    FundingType::Paid => None,
                };

                Ok(ClubCreated {
                    club,
                    member,
                    chat_room,
                })
            })
        })
        .await?;

    info!(club_id = created.club.id, status = %created.club.status, "club created");
    let message = match created.club.status {
        ClubStatus::Awaiting => "club created and awaiting approval",
        _ => "club created",
    };
    Ok(Reply::new(message, created))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChanged {
    pub club_id: i32,
    pub status: ClubStatus,
    /// Set when the transition had to provision the club's chat room.
    pub provisioned_chat_room: Option<ChatRoom>,
}

async fn transition(tx: &mut dyn Tx, club_id: i32, status: ClubStatus) -> AppResult<()> {
    if tx.set_club_status(club_id, status).await? == 0 {
        return Err(AppError::from(
            ErrorKind::Internal,
            "failed to change the club status",
        ));
    }
    Ok(())
}

pub async fn activate(store: &Store, club_id: i32) -> AppResult<Reply<StatusChanged>> {
    let changed = store
        .atomically(move |tx| {
            Box::pin(async move {
                let club = locked_club(tx, club_id).await?;
                match club.status {
                    ClubStatus::Active => {
                        return Err(AppError::from(
                            ErrorKind::Conflict,
                            "the club is already active",
                        ))
                    }
                    ClubStatus::Deleted => {
                        return Err(AppError::from(
                            ErrorKind::Conflict,
                            "a deleted club cannot change status",
                        ))
                    }
                    ClubStatus::Awaiting | ClubStatus::Pause => {}
                }
                transition(tx, club_id, ClubStatus::Active).await?;

                let provisioned_chat_room = match tx.find_chat_room(club_id).await? {
                    Some(_) => None,
                    None => Some(
                        tx.insert_chat_room(NewChatRoom {
                            club_id,
                            created_at: now(),
                        })
                        .await?,
                    ),
                };

                Ok(StatusChanged {
                    club_id,
                    status: ClubStatus::Active,
                    provisioned_chat_room,
                })
            })
        })
        .await?;

    info!(club_id, "club activated");
    Ok(Reply::new("the club status has changed", changed))
}

pub async fn pause(store: &Store, club_id: i32) -> AppResult<Reply<StatusChanged>> {
    let changed = store
        .atomically(move |tx| {
            Box::pin(async move {
                let club = locked_club(tx, club_id).await?;
                let refusal = match club.status {
                    ClubStatus::Active => None,
                    ClubStatus::Pause => Some("the club is already paused"),
                    ClubStatus::Awaiting => Some("a club awaiting approval cannot be paused"),
                    ClubStatus::Deleted => Some("a deleted club cannot change status"),
                };
                if let Some(refusal) = refusal {
                    return Err(AppError::from(ErrorKind::Conflict, refusal));
                }
                transition(tx, club_id, ClubStatus::Pause).await?;

                Ok(StatusChanged {
                    club_id,
                    status: ClubStatus::Pause,
                    provisioned_chat_room: None,
                })
            })
        })
        .await?;

    info!(club_id, "club paused");
    Ok(Reply::new("the club status has changed", changed))
}

/// Allow-list of club fields a leader may edit.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClub {
    pub name: Option<String>,
    pub introduction: Option<String>,
    pub region: Option<String>,
    pub category_id: Option<i32>,
    pub join_mode: Option<JoinMode>,
}

impl From<UpdateClub> for ClubChanges {
    fn from(req: UpdateClub) -> Self {
        ClubChanges {
            name: req.name.map(|n| n.trim().to_string()),
            introduction: req.introduction,
            region: req.region,
            category_id: req.category_id,
            join_mode: req.join_mode,
        }
    }
}

pub async fn update_club(
    store: &Store,
    requester: &Identity,
    club_id: i32,
    req: UpdateClub,
) -> AppResult<Reply<Club>> {
    let changes = ClubChanges::from(req);
    if changes.name.as_deref() == Some("") || changes.region.as_deref().map(str::trim) == Some("")
    {
        return Err(AppError::from(
            ErrorKind::BadRequest,
            "the club name and region must not be empty",
        ));
    }

    let user_id = requester.user_id;
    let club = store
        .atomically(move |tx| {
            Box::pin(async move {
                let club = locked_club(tx, club_id).await?;
                ensure_leader(&club, user_id, "edit the club")?;
                tx.update_club(club_id, changes).await?.ok_or_else(|| {
                    AppError::from(ErrorKind::Internal, "failed to update the club")
                })
            })
        })
        .await?;

    info!(club_id, "club updated");
    Ok(Reply::new("the club has been updated", club))
}

/// Soft delete: the row stays so schedules and memberships keep resolving.
pub async fn delete_club(
    store: &Store,
    requester: &Identity,
    club_id: i32,
) -> AppResult<Reply<Club>> {
    let user_id = requester.user_id;
    let club = store
        .atomically(move |tx| {
            Box::pin(async move {
                let mut club = locked_club(tx, club_id).await?;
                ensure_leader(&club, user_id, "delete the club")?;
                if club.status == ClubStatus::Deleted {
                    return Err(AppError::from(
                        ErrorKind::Conflict,
                        "the club is already deleted",
                    ));
                }
                transition(tx, club_id, ClubStatus::Deleted).await?;
                club.status = ClubStatus::Deleted;
                Ok(club)
            })
        })
        .await?;

    info!(club_id, "club deleted");
    Ok(Reply::new("the club has been deleted", club))
}

/// A club with every record it owns, as shown to administrators.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubDetail {
    #[serde(flatten)]
    pub club: Club,
    pub members: Vec<ClubMember>,
    pub banned_members: Vec<ClubBan>,
    pub schedules: Vec<Schedule>,
    pub chat_room: Option<ChatRoom>,
}

/// The projection ordinary users get; no member lists.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubSummary {
    pub id: i32,
    pub name: String,
    pub category_id: i32,
    pub leader_id: i32,
}

impl From<Club> for ClubSummary {
    fn from(club: Club) -> Self {
        ClubSummary {
            id: club.id,
            name: club.name,
            category_id: club.category_id,
            leader_id: club.leader_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RegionalClubs {
    All(Vec<ClubDetail>),
    Nearby {
        region: String,
        clubs: Vec<ClubSummary>,
    },
}

/// Administrators see every club with its related records; everybody else
/// sees the active clubs of their own region.
pub async fn list_by_region(store: &Store, caller: &Identity) -> AppResult<Reply<RegionalClubs>> {
    if caller.is_admin() {
        let details = store
            .read(|tx| {
                Box::pin(async move {
                    let clubs = tx.list_clubs(ClubFilter::default()).await?;
                    let ids = clubs.iter().map(|c| c.id).collect_vec();
                    let mut members = tx
                        .list_members(ids.clone())
                        .await?
                        .into_iter()
                        .into_group_map_by(|m| m.club_id);
                    let mut bans = tx
                        .list_bans(ids.clone())
                        .await?
                        .into_iter()
                        .into_group_map_by(|b| b.club_id);
                    let mut schedules = tx
                        .list_schedules(ids.clone())
                        .await?
                        .into_iter()
                        .into_group_map_by(|s| s.club_id);
                    let mut rooms = tx
                        .list_chat_rooms(ids)
                        .await?
                        .into_iter()
                        .map(|r| (r.club_id, r))
                        .collect::<std::collections::HashMap<_, _>>();

                    Ok(clubs
                        .into_iter()
                        .map(|club| ClubDetail {
                            members: members.remove(&club.id).unwrap_or_default(),
                            banned_members: bans.remove(&club.id).unwrap_or_default(),
                            schedules: schedules.remove(&club.id).unwrap_or_default(),
                            chat_room: rooms.remove(&club.id),
                            club,
                        })
                        .collect_vec())
                })
            })
            .await?;
        return Ok(Reply::new("returning every club", RegionalClubs::All(details)));
    }

    let filter = ClubFilter {
        region: Some(caller.region.clone()),
        status: Some(ClubStatus::Active),
        ..Default::default()
    };
    let clubs = store
        .read(move |tx| Box::pin(async move { tx.list_clubs(filter).await }))
        .await?;
    let message = if clubs.is_empty() {
        "there are no clubs in your region"
    } else {
        "returning the clubs in your region"
    };
    Ok(Reply::new(
        message,
        RegionalClubs::Nearby {
            region: caller.region.clone(),
            clubs: clubs.into_iter().map(ClubSummary::from).collect(),
        },
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubProfile {
    pub id: i32,
    pub name: String,
    pub introduction: Option<String>,
    pub region: String,
    pub leader_id: i32,
    pub member_count: usize,
    pub members: Vec<ClubMember>,
    pub schedules: Vec<Schedule>,
}

/// Public profile of an active club.
pub async fn get_club(store: &Store, club_id: i32) -> AppResult<Reply<ClubProfile>> {
    let profile = store
        .read(move |tx| {
            Box::pin(async move {
                let club = tx
                    .find_club(club_id)
                    .await?
                    .filter(|c| c.status == ClubStatus::Active)
                    .ok_or_else(|| {
                        AppError::from(ErrorKind::NotFound, "the club does not exist")
                    })?;
                let members = tx.list_members(vec![club_id]).await?;
                let schedules = tx.list_schedules(vec![club_id]).await?;
                Ok(ClubProfile {
                    id: club.id,
                    name: club.name,
                    introduction: club.introduction,
                    region: club.region,
                    leader_id: club.leader_id,
                    member_count: members.len(),
                    members,
                    schedules,
                })
            })
        })
        .await?;
    Ok(Reply::new("returning the club", profile))
}

#[derive(Debug, Serialize)]
pub struct ClubStatusView {
    pub name: String,
    pub status: ClubStatus,
}

pub async fn club_status(store: &Store, club_id: i32) -> AppResult<Reply<ClubStatusView>> {
    let club = store
        .read(move |tx| Box::pin(async move { existing_club(tx, club_id).await }))
        .await?;
    Ok(Reply::new(
        "returning the club status",
        ClubStatusView {
            name: club.name,
            status: club.status,
        },
    ))
}

async fn list_matching(store: &Store, filter: ClubFilter) -> AppResult<Vec<Club>> {
    store
        .read(move |tx| Box::pin(async move { tx.list_clubs(filter).await }))
        .await
}

pub async fn list_by_status(store: &Store, status: ClubStatus) -> AppResult<Reply<Vec<Club>>> {
    let filter = ClubFilter {
        status: Some(status),
        ..Default::default()
    };
    Ok(Reply::listed(
        list_matching(store, filter).await?,
        "returning the clubs with this status",
        "there are no clubs with this status",
    ))
}

pub async fn list_by_type(store: &Store, funding_type: FundingType) -> AppResult<Reply<Vec<Club>>> {
    let filter = ClubFilter {
        funding_type: Some(funding_type),
        ..Default::default()
    };
    Ok(Reply::listed(
        list_matching(store, filter).await?,
        "returning the clubs of this type",
        "there are no clubs of this type",
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryClub {
    pub id: i32,
    pub name: String,
    pub region: String,
    pub category_id: i32,
    pub leader_id: i32,
    pub member_ids: Vec<i32>,
}

pub async fn list_by_category(
    store: &Store,
    region: String,
    category_id: i32,
) -> AppResult<Reply<Vec<CategoryClub>>> {
    let clubs = store
        .read(move |tx| {
            Box::pin(async move {
                let clubs = tx
                    .list_clubs(ClubFilter {
                        region: Some(region),
                        category_id: Some(category_id),
                        ..Default::default()
                    })
                    .await?;
                let mut members = tx
                    .list_members(clubs.iter().map(|c| c.id).collect())
                    .await?
                    .into_iter()
                    .into_group_map_by(|m| m.club_id);

                Ok(clubs
                    .into_iter()
                    .map(|club| CategoryClub {
                        member_ids: members
                            .remove(&club.id)
                            .unwrap_or_default()
                            .into_iter()
                            .map(|m| m.user_id)
                            .collect(),
                        id: club.id,
                        name: club.name,
                        region: club.region,
                        category_id: club.category_id,
                        leader_id: club.leader_id,
                    })
                    .collect_vec())
            })
        })
        .await?;
    Ok(Reply::listed(
        clubs,
        "returning the clubs in this category",
        "there are no clubs in this category",
    ))
}

/// Active clubs whose name contains `keyword`.
pub async fn search(store: &Store, keyword: &str) -> AppResult<Reply<Vec<Club>>> {
    let filter = ClubFilter {
        status: Some(ClubStatus::Active),
        name_contains: Some(keyword.trim().to_string()),
        ..Default::default()
    };
    Ok(Reply::listed(
        list_matching(store, filter).await?,
        "returning every match",
        "no clubs matched the search",
    ))
}

/// Clubs where `user_id` holds a membership row, pending or admitted.
pub async fn joined_clubs(store: &Store, user_id: i32) -> AppResult<Reply<Vec<Club>>> {
    let clubs = store
        .read(move |tx| {
            Box::pin(async move {
                let ids = tx
                    .list_memberships(user_id)
                    .await?
                    .into_iter()
                    .map(|m| m.club_id)
                    .collect_vec();
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                tx.list_clubs(ClubFilter {
                    ids: Some(ids),
                    ..Default::default()
                })
                .await
            })
        })
        .await?;
    Ok(Reply::listed(
        clubs,
        "returning the clubs you joined",
        "you have not joined any club",
    ))
}

pub async fn operated_clubs(store: &Store, user_id: i32) -> AppResult<Reply<Vec<Club>>> {
    let filter = ClubFilter {
        leader_id: Some(user_id),
        ..Default::default()
    };
    Ok(Reply::listed(
        list_matching(store, filter).await?,
        "returning the clubs you operate",
        "you do not operate any club",
    ))
}
