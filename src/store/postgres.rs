use super::{ClubFilter, Tx, TxFuture};
use crate::{
    error::{AppError, AppResult, ErrorKind},
    models::*,
    schema::*,
    DbPool,
};
use async_trait::async_trait;
use deadpool::managed::Object;
use diesel::{
    pg::Pg,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    sql_types::Text,
};
use diesel_async::{
    pooled_connection::AsyncDieselConnectionManager, AsyncConnection, AsyncPgConnection,
    RunQueryDsl,
};
use scoped_futures::ScopedFutureExt;

pub(super) async fn atomically<T, F>(pool: &DbPool, op: F) -> AppResult<T>
where
    T: Send + 'static,
    F: for<'t> FnOnce(&'t mut dyn Tx) -> TxFuture<'t, T> + Send + 'static,
{
    let mut scope = TxScope {
        conn: Some(pool.get().await?),
        settled: false,
    };
    let conn = scope
        .conn
        .as_mut()
        .ok_or_else(|| anyhow::anyhow!("transaction connection already detached"))?;

    // diesel-async rolls back when the callback returns `Err`.
    let result = conn
        .transaction(|conn| {
            async move {
                let mut tx = PgTx { conn };
                op(&mut tx).await
            }
            .scope_boxed()
        })
        .await;
    scope.settled = true;
    result
}

/// Pooled connection owned by one `atomically` call.
///
/// If the call is dropped before the transaction reached commit or rollback,
/// the connection is taken out of the pool and closed instead of recycled,
/// and the server aborts the open transaction along with its locks.
struct TxScope {
    conn: Option<Object<AsyncDieselConnectionManager<AsyncPgConnection>>>,
    settled: bool,
}

impl Drop for TxScope {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(conn) = self.conn.take() {
            tracing::warn!("transaction abandoned before completion, discarding its connection");
            drop(Object::take(conn));
        }
    }
}

pub(super) async fn read<T, F>(pool: &DbPool, op: F) -> AppResult<T>
where
    T: Send + 'static,
    F: for<'t> FnOnce(&'t mut dyn Tx) -> TxFuture<'t, T> + Send + 'static,
{
    let mut conn = pool.get().await?;
    op(&mut PgTx { conn: &mut *conn }).await
}

struct PgTx<'c> {
    conn: &'c mut AsyncPgConnection,
}

impl PgTx<'_> {
    fn conn(&mut self) -> &mut AsyncPgConnection {
        &mut *self.conn
    }
}

fn conflict_on_duplicate(message: &'static str) -> impl FnOnce(DieselError) -> AppError {
    move |err| match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            AppError::from(ErrorKind::Conflict, message)
        }
        err => err.into(),
    }
}

fn escape_like(keyword: &str) -> String {
    keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl Tx for PgTx<'_> {
    async fn lock_club_name(&mut self, name: &str) -> AppResult<()> {
        diesel::sql_query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind::<Text, _>(name)
            .execute(self.conn())
            .await?;
        Ok(())
    }

    async fn club_name_taken(&mut self, name: &str) -> AppResult<bool> {
        let count: i64 = clubs::table
            .filter(clubs::name.eq(name))
            .filter(clubs::status.ne(ClubStatus::Deleted))
            .count()
            .get_result(self.conn())
            .await?;
        Ok(count > 0)
    }

    async fn insert_club(&mut self, club: NewClub) -> AppResult<Club> {
        Ok(diesel::insert_into(clubs::table)
            .values(club)
            .get_result::<Club>(self.conn())
            .await?)
    }

    async fn find_club(&mut self, id: i32) -> AppResult<Option<Club>> {
        Ok(clubs::table
            .find(id)
            .first::<Club>(self.conn())
            .await
            .optional()?)
    }

    async fn lock_club(&mut self, id: i32) -> AppResult<Option<Club>> {
        Ok(clubs::table
            .find(id)
            .for_update()
            .first::<Club>(self.conn())
            .await
            .optional()?)
    }

    async fn update_club(&mut self, id: i32, changes: ClubChanges) -> AppResult<Option<Club>> {
        if changes.is_empty() {
            return self.find_club(id).await;
        }
        Ok(diesel::update(clubs::table.find(id))
            .set(changes)
            .get_result::<Club>(self.conn())
            .await
            .optional()?)
    }

    async fn set_club_status(&mut self, id: i32, status: ClubStatus) -> AppResult<usize> {
        Ok(diesel::update(clubs::table.find(id))
            .set(clubs::status.eq(status))
            .execute(self.conn())
            .await?)
    }

    async fn list_clubs(&mut self, filter: ClubFilter) -> AppResult<Vec<Club>> {
        let mut query: clubs::BoxedQuery<'_, Pg> = clubs::table.into_boxed();
        if let Some(region) = filter.region {
            query = query.filter(clubs::region.eq(region));
        }
        if let Some(status) = filter.status {
            query = query.filter(clubs::status.eq(status));
        }
        if let Some(funding_type) = filter.funding_type {
            query = query.filter(clubs::funding_type.eq(funding_type));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(clubs::category_id.eq(category_id));
        }
        if let Some(leader_id) = filter.leader_id {
            query = query.filter(clubs::leader_id.eq(leader_id));
        }
        if let Some(ids) = filter.ids {
            query = query.filter(clubs::id.eq_any(ids));
        }
        if let Some(keyword) = filter.name_contains {
            query = query.filter(clubs::name.like(format!("%{}%", escape_like(&keyword))));
        }

        Ok(query
            .order(clubs::id.asc())
            .load::<Club>(self.conn())
            .await?)
    }

    async fn find_member(&mut self, club_id: i32, user_id: i32) -> AppResult<Option<ClubMember>> {
        Ok(club_members::table
            .find((club_id, user_id))
            .first::<ClubMember>(self.conn())
            .await
            .optional()?)
    }

    async fn insert_member(&mut self, member: ClubMember) -> AppResult<ClubMember> {
        diesel::insert_into(club_members::table)
            .values(member)
            .get_result::<ClubMember>(self.conn())
            .await
            .map_err(conflict_on_duplicate(
                "the user is already a member of the club",
            ))
    }

    async fn delete_member(&mut self, club_id: i32, user_id: i32) -> AppResult<usize> {
        Ok(diesel::delete(club_members::table.find((club_id, user_id)))
            .execute(self.conn())
            .await?)
    }

    async fn list_members(&mut self, club_ids: Vec<i32>) -> AppResult<Vec<ClubMember>> {
        Ok(club_members::table
            .filter(club_members::club_id.eq_any(club_ids))
            .order((club_members::club_id.asc(), club_members::joined_at.asc()))
            .load::<ClubMember>(self.conn())
            .await?)
    }

    async fn list_memberships(&mut self, user_id: i32) -> AppResult<Vec<ClubMember>> {
        Ok(club_members::table
            .filter(club_members::user_id.eq(user_id))
            .order(club_members::club_id.asc())
            .load::<ClubMember>(self.conn())
            .await?)
    }

    async fn find_ban(&mut self, club_id: i32, user_id: i32) -> AppResult<Option<ClubBan>> {
        Ok(club_ban_members::table
            .find((club_id, user_id))
            .first::<ClubBan>(self.conn())
            .await
            .optional()?)
    }

    async fn insert_ban(&mut self, ban: ClubBan) -> AppResult<ClubBan> {
        diesel::insert_into(club_ban_members::table)
            .values(ban)
            .get_result::<ClubBan>(self.conn())
            .await
            .map_err(conflict_on_duplicate(
                "the user is already banned from the club",
            ))
    }

    async fn list_bans(&mut self, club_ids: Vec<i32>) -> AppResult<Vec<ClubBan>> {
        Ok(club_ban_members::table
            .filter(club_ban_members::club_id.eq_any(club_ids))
            .order((
                club_ban_members::club_id.asc(),
                club_ban_members::banned_at.asc(),
            ))
            .load::<ClubBan>(self.conn())
            .await?)
    }

    async fn insert_schedule(&mut self, schedule: NewSchedule) -> AppResult<Schedule> {
        Ok(diesel::insert_into(club_schedules::table)
            .values(schedule)
            .get_result::<Schedule>(self.conn())
            .await?)
    }

    async fn find_schedule(&mut self, id: i32) -> AppResult<Option<Schedule>> {
        Ok(club_schedules::table
            .find(id)
            .first::<Schedule>(self.conn())
            .await
            .optional()?)
    }

    async fn lock_schedule(&mut self, id: i32) -> AppResult<Option<Schedule>> {
        Ok(club_schedules::table
            .find(id)
            .for_update()
            .first::<Schedule>(self.conn())
            .await
            .optional()?)
    }

    async fn update_schedule(
        &mut self,
        id: i32,
        changes: ScheduleChanges,
    ) -> AppResult<Option<Schedule>> {
        if changes.is_empty() {
            return self.find_schedule(id).await;
        }
        Ok(diesel::update(club_schedules::table.find(id))
            .set(changes)
            .get_result::<Schedule>(self.conn())
            .await
            .optional()?)
    }

    async fn delete_schedule(&mut self, id: i32) -> AppResult<usize> {
        Ok(diesel::delete(club_schedules::table.find(id))
            .execute(self.conn())
            .await?)
    }

    async fn list_schedules(&mut self, club_ids: Vec<i32>) -> AppResult<Vec<Schedule>> {
        Ok(club_schedules::table
            .filter(club_schedules::club_id.eq_any(club_ids))
            .order(club_schedules::start_date.asc())
            .load::<Schedule>(self.conn())
            .await?)
    }

    async fn list_schedules_attended_by(&mut self, user_id: i32) -> AppResult<Vec<Schedule>> {
        Ok(club_schedules::table
            .inner_join(club_schedule_members::table)
            .filter(club_schedule_members::member_id.eq(user_id))
            .select(club_schedules::all_columns)
            .order(club_schedules::start_date.asc())
            .load::<Schedule>(self.conn())
            .await?)
    }

    async fn find_attendance(
        &mut self,
        schedule_id: i32,
        member_id: i32,
    ) -> AppResult<Option<Attendance>> {
        Ok(club_schedule_members::table
            .find((schedule_id, member_id))
            .first::<Attendance>(self.conn())
            .await
            .optional()?)
    }

    async fn count_attendees(&mut self, schedule_id: i32) -> AppResult<i64> {
        Ok(club_schedule_members::table
            .filter(club_schedule_members::schedule_id.eq(schedule_id))
            .filter(club_schedule_members::status.eq(AttendStatus::Attend))
            .count()
            .get_result(self.conn())
            .await?)
    }

    async fn insert_attendance(&mut self, attendance: Attendance) -> AppResult<Attendance> {
        diesel::insert_into(club_schedule_members::table)
            .values(attendance)
            .get_result::<Attendance>(self.conn())
            .await
            .map_err(conflict_on_duplicate(
                "the member already attends the schedule",
            ))
    }

    async fn list_attendance(&mut self, schedule_id: i32) -> AppResult<Vec<Attendance>> {
        Ok(club_schedule_members::table
            .filter(club_schedule_members::schedule_id.eq(schedule_id))
            .order(club_schedule_members::applied_at.asc())
            .load::<Attendance>(self.conn())
            .await?)
    }

    async fn delete_attendance(&mut self, schedule_id: i32) -> AppResult<usize> {
        Ok(diesel::delete(
            club_schedule_members::table
                .filter(club_schedule_members::schedule_id.eq(schedule_id)),
        )
        .execute(self.conn())
        .await?)
    }

    async fn insert_chat_room(&mut self, room: NewChatRoom) -> AppResult<ChatRoom> {
        diesel::insert_into(club_chat_rooms::table)
            .values(room)
            .get_result::<ChatRoom>(self.conn())
            .await
            .map_err(conflict_on_duplicate("the club already has a chat room"))
    }

    async fn find_chat_room(&mut self, club_id: i32) -> AppResult<Option<ChatRoom>> {
        Ok(club_chat_rooms::table
            .filter(club_chat_rooms::club_id.eq(club_id))
            .first::<ChatRoom>(self.conn())
            .await
            .optional()?)
    }

    async fn list_chat_rooms(&mut self, club_ids: Vec<i32>) -> AppResult<Vec<ChatRoom>> {
        Ok(club_chat_rooms::table
            .filter(club_chat_rooms::club_id.eq_any(club_ids))
            .load::<ChatRoom>(self.conn())
            .await?)
    }

    async fn find_chat_member(
        &mut self,
        room_id: i32,
        user_id: i32,
    ) -> AppResult<Option<ChatRoomMember>> {
        Ok(club_chat_room_members::table
            .find((room_id, user_id))
            .first::<ChatRoomMember>(self.conn())
            .await
            .optional()?)
    }

    async fn insert_chat_member(&mut self, member: ChatRoomMember) -> AppResult<ChatRoomMember> {
        diesel::insert_into(club_chat_room_members::table)
            .values(member)
            .get_result::<ChatRoomMember>(self.conn())
            .await
            .map_err(conflict_on_duplicate("the user is already in the chat room"))
    }

    async fn delete_chat_member(&mut self, room_id: i32, user_id: i32) -> AppResult<usize> {
        Ok(diesel::delete(club_chat_room_members::table.find((room_id, user_id)))
            .execute(self.conn())
            .await?)
    }
}
