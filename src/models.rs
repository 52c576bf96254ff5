use crate::schema::*;
use chrono::NaiveDateTime;
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, Output, ToSql},
    sql_types::Text,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Declares an enum persisted as a `VARCHAR` column, spelled the same way on
/// the wire and in the database.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            Serialize,
            Deserialize,
            AsExpression,
            FromSqlRow,
        )]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(anyhow::anyhow!(
                        "unknown {} `{}`",
                        stringify!($name),
                        other
                    )),
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                Ok(raw.parse::<$name>()?)
            }
        }
    };
}

text_enum! {
    /// Lifecycle of a club. `Deleted` is terminal.
    ClubStatus {
        Awaiting => "AWAITING",
        Active => "ACTIVE",
        Pause => "PAUSE",
        Deleted => "DELETED",
    }
}

text_enum! {
    /// Admission policy applied to join requests.
    JoinMode {
        Auto => "AUTO",
        Approval => "APPROVAL",
    }
}

text_enum! {
    FundingType {
        Free => "FREE",
        Paid => "PAID",
    }
}

text_enum! {
    /// `Wait` is a pending request, `Join` an active member.
    MemberStatus {
        Wait => "WAIT",
        Join => "JOIN",
    }
}

text_enum! {
    AttendStatus {
        Attend => "ATTEND",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Identifiable)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    pub id: i32,
    pub name: String,
    pub introduction: Option<String>,
    pub region: String,
    pub category_id: i32,
    pub leader_id: i32,
    pub join_mode: JoinMode,
    pub funding_type: FundingType,
    pub status: ClubStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = clubs)]
pub struct NewClub {
    pub name: String,
    pub introduction: Option<String>,
    pub region: String,
    pub category_id: i32,
    pub leader_id: i32,
    pub join_mode: JoinMode,
    pub funding_type: FundingType,
    pub status: ClubStatus,
    pub created_at: NaiveDateTime,
}

/// The club fields a leader may change. Status, leader and funding type are
/// deliberately absent.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = clubs)]
pub struct ClubChanges {
    pub name: Option<String>,
    pub introduction: Option<String>,
    pub region: Option<String>,
    pub category_id: Option<i32>,
    pub join_mode: Option<JoinMode>,
}

impl ClubChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.introduction.is_none()
            && self.region.is_none()
            && self.category_id.is_none()
            && self.join_mode.is_none()
    }

    pub fn apply(&self, club: &mut Club) {
        if let Some(name) = &self.name {
            club.name = name.clone();
        }
        if let Some(introduction) = &self.introduction {
            club.introduction = Some(introduction.clone());
        }
        if let Some(region) = &self.region {
            club.region = region.clone();
        }
        if let Some(category_id) = self.category_id {
            club.category_id = category_id;
        }
        if let Some(join_mode) = self.join_mode {
            club.join_mode = join_mode;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Insertable)]
#[diesel(table_name = club_members)]
#[serde(rename_all = "camelCase")]
pub struct ClubMember {
    pub club_id: i32,
    pub user_id: i32,
    pub status: MemberStatus,
    pub joined_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Insertable)]
#[diesel(table_name = club_ban_members)]
#[serde(rename_all = "camelCase")]
pub struct ClubBan {
    pub club_id: i32,
    pub banned_user_id: i32,
    pub banned_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Identifiable)]
#[diesel(table_name = club_schedules)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: i32,
    pub club_id: i32,
    pub title: String,
    pub content: Option<String>,
    pub place: String,
    pub price: Option<i32>,
    pub funding_type: FundingType,
    pub max_attendee: i32,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = club_schedules)]
pub struct NewSchedule {
    pub club_id: i32,
    pub title: String,
    pub content: Option<String>,
    pub place: String,
    pub price: Option<i32>,
    pub funding_type: FundingType,
    pub max_attendee: i32,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
}

/// The schedule fields a leader may change. Price and funding type are fixed
/// once capacity has been offered.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = club_schedules)]
pub struct ScheduleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub place: Option<String>,
    pub max_attendee: Option<i32>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

impl ScheduleChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.place.is_none()
            && self.max_attendee.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }

    pub fn apply(&self, schedule: &mut Schedule) {
        if let Some(title) = &self.title {
            schedule.title = title.clone();
        }
        if let Some(content) = &self.content {
            schedule.content = Some(content.clone());
        }
        if let Some(place) = &self.place {
            schedule.place = place.clone();
        }
        if let Some(max_attendee) = self.max_attendee {
            schedule.max_attendee = max_attendee;
        }
        if let Some(start_date) = self.start_date {
            schedule.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            schedule.end_date = end_date;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Insertable)]
#[diesel(table_name = club_schedule_members)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub schedule_id: i32,
    pub member_id: i32,
    pub status: AttendStatus,
    pub applied_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Identifiable)]
#[diesel(table_name = club_chat_rooms)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: i32,
    pub club_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = club_chat_rooms)]
pub struct NewChatRoom {
    pub club_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Insertable)]
#[diesel(table_name = club_chat_room_members)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomMember {
    pub room_id: i32,
    pub user_id: i32,
    pub joined_at: NaiveDateTime,
}
