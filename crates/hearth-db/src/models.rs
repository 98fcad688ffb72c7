//! Database row types. These map directly to SQLite rows and are converted
//! into hearth-types records at the edge of the query layer.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use hearth_types::models::{FriendRequest, Message, UserRecord};

use crate::store::StoreError;

/// A user together with the stored password hash. Only produced for login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: UserRecord,
    pub password_hash: String,
}

/// Case folding used for username search by every engine.
pub fn fold_username(username: &str) -> String {
    username.to_lowercase()
}

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

pub struct FriendRequestRow {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: String,
    pub created_at: String,
    pub responded_at: Option<String>,
}

pub struct MessageRow {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub content: String,
    pub created_at: String,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserRecord {
            id: parse_id(&row.id)?,
            username: row.username,
            email: row.email,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl TryFrom<FriendRequestRow> for FriendRequest {
    type Error = StoreError;

    fn try_from(row: FriendRequestRow) -> Result<Self, Self::Error> {
        Ok(FriendRequest {
            id: parse_id(&row.id)?,
            from_user_id: parse_id(&row.from_user_id)?,
            to_user_id: parse_id(&row.to_user_id)?,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("friend request '{}': {}", row.id, e)))?,
            created_at: parse_timestamp(&row.created_at)?,
            responded_at: row.responded_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Message {
            id: parse_id(&row.id)?,
            from_user_id: parse_id(&row.from_user_id)?,
            to_user_id: parse_id(&row.to_user_id)?,
            content: row.content,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

/// Fixed-width RFC 3339 so that text ordering equals time ordering.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{}': {}", raw, e)))
}

fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    raw.parse()
        .map_err(|e| StoreError::Corrupt(format!("id '{}': {}", raw, e)))
}
