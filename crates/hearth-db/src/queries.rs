use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use hearth_types::models::{FriendRequest, FriendRequestStatus, Message, PairKey, UserRecord};

use crate::Database;
use crate::models::{
    Credentials, FriendRequestRow, MessageRow, UserRow, fold_username, format_timestamp,
};
use crate::store::{FriendRequestStore, IdentityStore, MessageStore, StoreError, StoreResult};

const USER_COLUMNS: &str = "id, username, email, created_at";
const FRIEND_REQUEST_COLUMNS: &str =
    "id, from_user_id, to_user_id, status, created_at, responded_at";
const MESSAGE_COLUMNS: &str = "id, from_user_id, to_user_id, content, created_at";

// -- Users --

impl IdentityStore for Database {
    fn create_user(&self, user: &UserRecord, password_hash: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, username_folded, email, password, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    user.id.to_string(),
                    user.username,
                    fold_username(&user.username),
                    user.email,
                    password_hash,
                    format_timestamp(&user.created_at),
                ],
            )?;
            Ok(())
        })
    }

    fn user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    fn user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    fn user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    fn credentials_by_email(&self, email: &str) -> StoreResult<Option<Credentials>> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS}, password FROM users WHERE email = ?1"),
                    [email],
                    |row| Ok((user_row(row)?, row.get::<_, String>(4)?)),
                )
                .optional()?;

            found
                .map(|(row, password_hash)| {
                    Ok::<_, StoreError>(Credentials {
                        user: UserRecord::try_from(row)?,
                        password_hash,
                    })
                })
                .transpose()
        })
    }

    fn search_users(&self, query: &str) -> StoreResult<Vec<UserRecord>> {
        self.with_conn(|conn| {
            // instr() rather than LIKE so '%' and '_' in the query are literal
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE instr(username_folded, ?1) > 0
                 ORDER BY username"
            ))?;

            let rows = stmt
                .query_map([fold_username(query)], user_row)?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(UserRecord::try_from).collect()
        })
    }
}

// -- Friend requests --

impl FriendRequestStore for Database {
    fn open_friend_request(&self, request: &FriendRequest) -> StoreResult<()> {
        let pair = request.pair();
        let low = pair.low.to_string();
        let high = pair.high.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM friend_requests
                 WHERE user_low = ?1 AND user_high = ?2 AND status = 'rejected'",
                (&low, &high),
            )?;

            // UNIQUE(user_low, user_high) turns a pending/accepted duplicate into Conflict
            tx.execute(
                "INSERT INTO friend_requests
                    (id, from_user_id, to_user_id, user_low, user_high, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    request.id.to_string(),
                    request.from_user_id.to_string(),
                    request.to_user_id.to_string(),
                    low,
                    high,
                    request.status.as_str(),
                    format_timestamp(&request.created_at),
                ],
            )?;

            tx.commit()?;
            Ok(())
        })
    }

    fn friend_request(&self, id: Uuid) -> StoreResult<Option<FriendRequest>> {
        self.with_conn(|conn| query_friend_request_by_id(conn, &id.to_string()))
    }

    fn friend_request_between(&self, a: Uuid, b: Uuid) -> StoreResult<Option<FriendRequest>> {
        let pair = PairKey::new(a, b);
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {FRIEND_REQUEST_COLUMNS} FROM friend_requests
                     WHERE user_low = ?1 AND user_high = ?2"
                ),
                (pair.low.to_string(), pair.high.to_string()),
                friend_request_row,
            )
            .optional()?
            .map(FriendRequest::try_from)
            .transpose()
        })
    }

    fn friend_requests_for(&self, user_id: Uuid) -> StoreResult<Vec<FriendRequest>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FRIEND_REQUEST_COLUMNS} FROM friend_requests
                 WHERE from_user_id = ?1 OR to_user_id = ?1
                 ORDER BY created_at"
            ))?;

            let rows = stmt
                .query_map([user_id.to_string()], friend_request_row)?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(FriendRequest::try_from).collect()
        })
    }

    fn incoming_pending(&self, user_id: Uuid) -> StoreResult<Vec<FriendRequest>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FRIEND_REQUEST_COLUMNS} FROM friend_requests
                 WHERE to_user_id = ?1 AND status = 'pending'
                 ORDER BY created_at"
            ))?;

            let rows = stmt
                .query_map([user_id.to_string()], friend_request_row)?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(FriendRequest::try_from).collect()
        })
    }

    fn resolve_friend_request(
        &self,
        id: Uuid,
        status: FriendRequestStatus,
        responded_at: DateTime<Utc>,
    ) -> StoreResult<Option<FriendRequest>> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let changed = tx.execute(
                "UPDATE friend_requests SET status = ?1, responded_at = ?2
                 WHERE id = ?3 AND status = 'pending'",
                (status.as_str(), format_timestamp(&responded_at), &id),
            )?;

            if changed == 0 {
                return Ok(None);
            }

            let updated = query_friend_request_by_id(&tx, &id)?;
            tx.commit()?;
            Ok(updated)
        })
    }
}

// -- Messages --

impl MessageStore for Database {
    fn insert_message(&self, message: &Message) -> StoreResult<()> {
        let pair = message.pair();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages
                    (id, from_user_id, to_user_id, user_low, user_high, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    message.id.to_string(),
                    message.from_user_id.to_string(),
                    message.to_user_id.to_string(),
                    pair.low.to_string(),
                    pair.high.to_string(),
                    message.content,
                    format_timestamp(&message.created_at),
                ],
            )?;
            Ok(())
        })
    }

    fn messages_between(&self, a: Uuid, b: Uuid) -> StoreResult<Vec<Message>> {
        let pair = PairKey::new(a, b);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE user_low = ?1 AND user_high = ?2
                 ORDER BY created_at ASC, seq ASC"
            ))?;

            let rows = stmt
                .query_map((pair.low.to_string(), pair.high.to_string()), |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        from_user_id: row.get(1)?,
                        to_user_id: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(Message::try_from).collect()
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> StoreResult<Option<UserRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"
    ))?;

    stmt.query_row([value], user_row)
        .optional()?
        .map(UserRecord::try_from)
        .transpose()
}

fn query_friend_request_by_id(conn: &Connection, id: &str) -> StoreResult<Option<FriendRequest>> {
    conn.query_row(
        &format!("SELECT {FRIEND_REQUEST_COLUMNS} FROM friend_requests WHERE id = ?1"),
        [id],
        friend_request_row,
    )
    .optional()?
    .map(FriendRequest::try_from)
    .transpose()
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn friend_request_row(row: &Row<'_>) -> rusqlite::Result<FriendRequestRow> {
    Ok(FriendRequestRow {
        id: row.get(0)?,
        from_user_id: row.get(1)?,
        to_user_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        responded_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::from(e)),
        }
    }
}
