//! Persistence for clubs and everything they own.
//!
//! Every repository call goes through a [`Tx`] handle. Multi-step operations
//! obtain one from [`Store::atomically`], which commits when the operation
//! returns `Ok` and rolls back otherwise; read-only projections use
//! [`Store::read`] and run outside a transaction.

mod memory;
mod postgres;

pub use memory::MemoryStore;

use crate::{
    error::AppResult,
    models::*,
    DbPool,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::str::FromStr;

/// Future returned by a unit of work run against a [`Tx`].
pub type TxFuture<'t, T> = BoxFuture<'t, AppResult<T>>;

/// Repository operations available inside one logical operation.
///
/// `lock_*` methods read a row and hold it until the surrounding transaction
/// ends, so checks made against it stay valid until commit.
#[async_trait]
pub trait Tx: Send {
    /// Serialises concurrent creations of clubs sharing a name.
    async fn lock_club_name(&mut self, name: &str) -> AppResult<()>;
    /// Whether a club that is not deleted already uses `name`.
    async fn club_name_taken(&mut self, name: &str) -> AppResult<bool>;
    async fn insert_club(&mut self, club: NewClub) -> AppResult<Club>;
    async fn find_club(&mut self, id: i32) -> AppResult<Option<Club>>;
    async fn lock_club(&mut self, id: i32) -> AppResult<Option<Club>>;
    async fn update_club(&mut self, id: i32, changes: ClubChanges) -> AppResult<Option<Club>>;
    async fn set_club_status(&mut self, id: i32, status: ClubStatus) -> AppResult<usize>;
    async fn list_clubs(&mut self, filter: ClubFilter) -> AppResult<Vec<Club>>;

    async fn find_member(&mut self, club_id: i32, user_id: i32) -> AppResult<Option<ClubMember>>;
    async fn insert_member(&mut self, member: ClubMember) -> AppResult<ClubMember>;
    async fn delete_member(&mut self, club_id: i32, user_id: i32) -> AppResult<usize>;
    async fn list_members(&mut self, club_ids: Vec<i32>) -> AppResult<Vec<ClubMember>>;
    async fn list_memberships(&mut self, user_id: i32) -> AppResult<Vec<ClubMember>>;

    async fn find_ban(&mut self, club_id: i32, user_id: i32) -> AppResult<Option<ClubBan>>;
    async fn insert_ban(&mut self, ban: ClubBan) -> AppResult<ClubBan>;
    async fn list_bans(&mut self, club_ids: Vec<i32>) -> AppResult<Vec<ClubBan>>;

    async fn insert_schedule(&mut self, schedule: NewSchedule) -> AppResult<Schedule>;
    async fn find_schedule(&mut self, id: i32) -> AppResult<Option<Schedule>>;
    async fn lock_schedule(&mut self, id: i32) -> AppResult<Option<Schedule>>;
    async fn update_schedule(
        &mut self,
        id: i32,
        changes: ScheduleChanges,
    ) -> AppResult<Option<Schedule>>;
    async fn delete_schedule(&mut self, id: i32) -> AppResult<usize>;
    async fn list_schedules(&mut self, club_ids: Vec<i32>) -> AppResult<Vec<Schedule>>;
    async fn list_schedules_attended_by(&mut self, user_id: i32) -> AppResult<Vec<Schedule>>;

    async fn find_attendance(
        &mut self,
        schedule_id: i32,
        member_id: i32,
    ) -> AppResult<Option<Attendance>>;
    async fn count_attendees(&mut self, schedule_id: i32) -> AppResult<i64>;
    async fn insert_attendance(&mut self, attendance: Attendance) -> AppResult<Attendance>;
    async fn list_attendance(&mut self, schedule_id: i32) -> AppResult<Vec<Attendance>>;
    async fn delete_attendance(&mut self, schedule_id: i32) -> AppResult<usize>;

    async fn insert_chat_room(&mut self, room: NewChatRoom) -> AppResult<ChatRoom>;
    async fn find_chat_room(&mut self, club_id: i32) -> AppResult<Option<ChatRoom>>;
    async fn list_chat_rooms(&mut self, club_ids: Vec<i32>) -> AppResult<Vec<ChatRoom>>;
    async fn find_chat_member(
        &mut self,
        room_id: i32,
        user_id: i32,
    ) -> AppResult<Option<ChatRoomMember>>;
    async fn insert_chat_member(&mut self, member: ChatRoomMember) -> AppResult<ChatRoomMember>;
    async fn delete_chat_member(&mut self, room_id: i32, user_id: i32) -> AppResult<usize>;
}

/// Conjunction of optional club predicates.
#[derive(Debug, Clone, Default)]
pub struct ClubFilter {
    pub region: Option<String>,
    pub status: Option<ClubStatus>,
    pub funding_type: Option<FundingType>,
    pub category_id: Option<i32>,
    pub leader_id: Option<i32>,
    pub ids: Option<Vec<i32>>,
    pub name_contains: Option<String>,
}

impl ClubFilter {
    pub fn matches(&self, club: &Club) -> bool {
        self.region.as_ref().map_or(true, |r| &club.region == r)
            && self.status.map_or(true, |s| club.status == s)
            && self.funding_type.map_or(true, |f| club.funding_type == f)
            && self.category_id.map_or(true, |c| club.category_id == c)
            && self.leader_id.map_or(true, |l| club.leader_id == l)
            && self.ids.as_ref().map_or(true, |ids| ids.contains(&club.id))
            && self
                .name_contains
                .as_ref()
                .map_or(true, |k| club.name.contains(k.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreKind::Postgres),
            "memory" | "mem" => Ok(StoreKind::Memory),
            other => Err(anyhow::anyhow!("unknown store `{other}`")),
        }
    }
}

/// Handle to the backing store, cheap to clone and shared through an axum
/// `Extension`.
#[derive(Clone)]
pub enum Store {
    Postgres(DbPool),
    Memory(MemoryStore),
}

impl Store {
    pub fn memory() -> Store {
        Store::Memory(MemoryStore::default())
    }

    pub fn connect(kind: StoreKind, db_url: Option<&str>) -> anyhow::Result<Store> {
        match kind {
            StoreKind::Memory => Ok(Store::memory()),
            StoreKind::Postgres => {
                let db_url = db_url.ok_or_else(|| {
                    anyhow::anyhow!("DATABASE_URL must be set for the postgres store")
                })?;
                Ok(Store::Postgres(crate::connect_to_db(db_url)?))
            }
        }
    }

    /// Runs `op` as one all-or-nothing unit.
    ///
    /// Nothing `op` wrote is visible to anyone else unless it returns `Ok`.
    pub async fn atomically<T, F>(&self, op: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn Tx) -> TxFuture<'t, T> + Send + 'static,
    {
        let result = match self {
            Store::Postgres(pool) => postgres::atomically(pool, op).await,
            Store::Memory(store) => store.atomically(op).await,
        };
        if let Err(err) = &result {
            tracing::debug!(kind = ?err.kind(), message = err.message(), "transaction rolled back");
        }
        result
    }

    /// Runs a read-only projection without opening a transaction.
    pub async fn read<T, F>(&self, op: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn Tx) -> TxFuture<'t, T> + Send + 'static,
    {
        match self {
            Store::Postgres(pool) => postgres::read(pool, op).await,
            Store::Memory(store) => store.read(op).await,
        }
    }
}
