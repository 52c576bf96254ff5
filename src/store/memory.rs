use super::{ClubFilter, Tx, TxFuture};
use crate::{
    error::{AppError, AppResult, ErrorKind},
    models::*,
};
use async_trait::async_trait;
use std::{
    collections::{btree_map::Entry, BTreeMap},
    sync::Arc,
};
use tokio::sync::Mutex;

/// Process-local store used for development and tests.
///
/// Transactions run one at a time against a copy of the committed state; the
/// copy replaces the committed state only when the transaction succeeds.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Clone, Default)]
struct State {
    clubs: BTreeMap<i32, Club>,
    members: BTreeMap<(i32, i32), ClubMember>,
    bans: BTreeMap<(i32, i32), ClubBan>,
    schedules: BTreeMap<i32, Schedule>,
    attendance: BTreeMap<(i32, i32), Attendance>,
    chat_rooms: BTreeMap<i32, ChatRoom>,
    chat_members: BTreeMap<(i32, i32), ChatRoomMember>,
    last_club_id: i32,
    last_schedule_id: i32,
    last_room_id: i32,
}

impl MemoryStore {
    pub(super) async fn atomically<T, F>(&self, op: F) -> AppResult<T>
    where
        F: for<'t> FnOnce(&'t mut dyn Tx) -> TxFuture<'t, T>,
    {
        let mut committed = self.state.lock().await;
        let mut draft = committed.clone();
        let result = op(&mut MemoryTx { state: &mut draft }).await;
        if result.is_ok() {
            *committed = draft;
        }
        result
    }

    pub(super) async fn read<T, F>(&self, op: F) -> AppResult<T>
    where
        F: for<'t> FnOnce(&'t mut dyn Tx) -> TxFuture<'t, T>,
    {
        let mut snapshot = self.state.lock().await.clone();
        op(&mut MemoryTx {
            state: &mut snapshot,
        })
        .await
    }
}

struct MemoryTx<'s> {
    state: &'s mut State,
}

fn insert_unique<K: Ord, V: Clone>(
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    conflict: &'static str,
) -> AppResult<V> {
    match map.entry(key) {
        Entry::Occupied(_) => Err(AppError::from(ErrorKind::Conflict, conflict)),
        Entry::Vacant(slot) => Ok(slot.insert(value).clone()),
    }
}

#[async_trait]
impl Tx for MemoryTx<'_> {
    async fn lock_club_name(&mut self, _name: &str) -> AppResult<()> {
        Ok(())
    }

    async fn club_name_taken(&mut self, name: &str) -> AppResult<bool> {
        Ok(self
            .state
            .clubs
            .values()
            .any(|c| c.name == name && c.status != ClubStatus::Deleted))
    }

    async fn insert_club(&mut self, club: NewClub) -> AppResult<Club> {
        self.state.last_club_id += 1;
        let club = Club {
            id: self.state.last_club_id,
            name: club.name,
            introduction: club.introduction,
            region: club.region,
            category_id: club.category_id,
            leader_id: club.leader_id,
            join_mode: club.join_mode,
            funding_type: club.funding_type,
            status: club.status,
            created_at: club.created_at,
        };
        self.state.clubs.insert(club.id, club.clone());
        Ok(club)
    }

    async fn find_club(&mut self, id: i32) -> AppResult<Option<Club>> {
        Ok(self.state.clubs.get(&id).cloned())
    }

    async fn lock_club(&mut self, id: i32) -> AppResult<Option<Club>> {
        self.find_club(id).await
    }

    async fn update_club(&mut self, id: i32, changes: ClubChanges) -> AppResult<Option<Club>> {
        Ok(self.state.clubs.get_mut(&id).map(|club| {
            changes.apply(club);
            club.clone()
        }))
    }

    async fn set_club_status(&mut self, id: i32, status: ClubStatus) -> AppResult<usize> {
        Ok(match self.state.clubs.get_mut(&id) {
            Some(club) => {
                club.status = status;
                1
            }
            None => 0,
        })
    }

    async fn list_clubs(&mut self, filter: ClubFilter) -> AppResult<Vec<Club>> {
        Ok(self
            .state
            .clubs
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    async fn find_member(&mut self, club_id: i32, user_id: i32) -> AppResult<Option<ClubMember>> {
        Ok(self.state.members.get(&(club_id, user_id)).cloned())
    }

    async fn insert_member(&mut self, member: ClubMember) -> AppResult<ClubMember> {
        insert_unique(
            &mut self.state.members,
            (member.club_id, member.user_id),
            member,
            "the user is already a member of the club",
        )
    }

    async fn delete_member(&mut self, club_id: i32, user_id: i32) -> AppResult<usize> {
        Ok(self.state.members.remove(&(club_id, user_id)).map_or(0, |_| 1))
    }

    async fn list_members(&mut self, club_ids: Vec<i32>) -> AppResult<Vec<ClubMember>> {
        Ok(self
            .state
            .members
            .values()
            .filter(|m| club_ids.contains(&m.club_id))
            .cloned()
            .collect())
    }

    async fn list_memberships(&mut self, user_id: i32) -> AppResult<Vec<ClubMember>> {
        Ok(self
            .state
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_ban(&mut self, club_id: i32, user_id: i32) -> AppResult<Option<ClubBan>> {
        Ok(self.state.bans.get(&(club_id, user_id)).cloned())
    }

    async fn insert_ban(&mut self, ban: ClubBan) -> AppResult<ClubBan> {
        insert_unique(
            &mut self.state.bans,
            (ban.club_id, ban.banned_user_id),
            ban,
            "the user is already banned from the club",
        )
    }

    async fn list_bans(&mut self, club_ids: Vec<i32>) -> AppResult<Vec<ClubBan>> {
        Ok(self
            .state
            .bans
            .values()
            .filter(|b| club_ids.contains(&b.club_id))
            .cloned()
            .collect())
    }

    async fn insert_schedule(&mut self, schedule: NewSchedule) -> AppResult<Schedule> {
        self.state.last_schedule_id += 1;
        let schedule = Schedule {
            id: self.state.last_schedule_id,
            club_id: schedule.club_id,
            title: schedule.title,
            content: schedule.content,
            place: schedule.place,
            price: schedule.price,
            funding_type: schedule.funding_type,
            max_attendee: schedule.max_attendee,
            start_date: schedule.start_date,
            end_date: schedule.end_date,
        };
        self.state.schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn find_schedule(&mut self, id: i32) -> AppResult<Option<Schedule>> {
        Ok(self.state.schedules.get(&id).cloned())
    }

    async fn lock_schedule(&mut self, id: i32) -> AppResult<Option<Schedule>> {
        self.find_schedule(id).await
    }

    async fn update_schedule(
        &mut self,
        id: i32,
        changes: ScheduleChanges,
    ) -> AppResult<Option<Schedule>> {
        Ok(self.state.schedules.get_mut(&id).map(|schedule| {
            changes.apply(schedule);
            schedule.clone()
        }))
    }

    async fn delete_schedule(&mut self, id: i32) -> AppResult<usize> {
        Ok(self.state.schedules.remove(&id).map_or(0, |_| 1))
    }

    async fn list_schedules(&mut self, club_ids: Vec<i32>) -> AppResult<Vec<Schedule>> {
        Ok(self
            .state
            .schedules
            .values()
            .filter(|s| club_ids.contains(&s.club_id))
            .cloned()
            .collect())
    }

    async fn list_schedules_attended_by(&mut self, user_id: i32) -> AppResult<Vec<Schedule>> {
        let state = &*self.state;
        Ok(state
            .attendance
            .values()
            .filter(|a| a.member_id == user_id)
            .filter_map(|a| state.schedules.get(&a.schedule_id))
            .cloned()
            .collect())
    }

    async fn find_attendance(
        &mut self,
        schedule_id: i32,
        member_id: i32,
    ) -> AppResult<Option<Attendance>> {
        Ok(self.state.attendance.get(&(schedule_id, member_id)).cloned())
    }

    async fn count_attendees(&mut self, schedule_id: i32) -> AppResult<i64> {
        Ok(self
            .state
            .attendance
            .values()
            .filter(|a| a.schedule_id == schedule_id && a.status == AttendStatus::Attend)
            .count() as i64)
    }

    async fn insert_attendance(&mut self, attendance: Attendance) -> AppResult<Attendance> {
        insert_unique(
            &mut self.state.attendance,
            (attendance.schedule_id, attendance.member_id),
            attendance,
            "the member already attends the schedule",
        )
    }

    async fn list_attendance(&mut self, schedule_id: i32) -> AppResult<Vec<Attendance>> {
        Ok(self
            .state
            .attendance
            .values()
            .filter(|a| a.schedule_id == schedule_id)
            .cloned()
            .collect())
    }

    async fn delete_attendance(&mut self, schedule_id: i32) -> AppResult<usize> {
        let before = self.state.attendance.len();
        self.state
            .attendance
            .retain(|(sid, _), _| *sid != schedule_id);
        Ok(before - self.state.attendance.len())
    }

    async fn insert_chat_room(&mut self, room: NewChatRoom) -> AppResult<ChatRoom> {
        if self.state.chat_rooms.values().any(|r| r.club_id == room.club_id) {
            return Err(AppError::from(
                ErrorKind::Conflict,
                "the club already has a chat room",
            ));
        }
        self.state.last_room_id += 1;
        let room = ChatRoom {
            id: self.state.last_room_id,
            club_id: room.club_id,
            created_at: room.created_at,
        };
        self.state.chat_rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn find_chat_room(&mut self, club_id: i32) -> AppResult<Option<ChatRoom>> {
        Ok(self
            .state
            .chat_rooms
            .values()
            .find(|r| r.club_id == club_id)
            .cloned())
    }

    async fn list_chat_rooms(&mut self, club_ids: Vec<i32>) -> AppResult<Vec<ChatRoom>> {
        Ok(self
            .state
            .chat_rooms
            .values()
            .filter(|r| club_ids.contains(&r.club_id))
            .cloned()
            .collect())
    }

    async fn find_chat_member(
        &mut self,
        room_id: i32,
        user_id: i32,
    ) -> AppResult<Option<ChatRoomMember>> {
        Ok(self.state.chat_members.get(&(room_id, user_id)).cloned())
    }

    async fn insert_chat_member(&mut self, member: ChatRoomMember) -> AppResult<ChatRoomMember> {
        insert_unique(
            &mut self.state.chat_members,
            (member.room_id, member.user_id),
            member,
            "the user is already in the chat room",
        )
    }

    async fn delete_chat_member(&mut self, room_id: i32, user_id: i32) -> AppResult<usize> {
        Ok(self
            .state
            .chat_members
            .remove(&(room_id, user_id))
            .map_or(0, |_| 1))
    }
}
