//! Storage interface shared by the SQLite engine and the in-memory engine.
//!
//! Services hold an `Arc<dyn Store>` and never see which engine is behind it.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use hearth_types::models::{FriendRequest, FriendRequestStatus, Message, UserRecord};

use crate::models::Credentials;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness rule refused the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, msg) = &e {
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            {
                return StoreError::Conflict(msg.clone().unwrap_or_else(|| e.to_string()));
            }
        }
        StoreError::Backend(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait IdentityStore {
    /// Fails with `Conflict` if the id, username or email is taken.
    fn create_user(&self, user: &UserRecord, password_hash: &str) -> StoreResult<()>;

    fn user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;

    fn user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    fn user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>>;

    /// The only accessor that returns the credential hash.
    fn credentials_by_email(&self, email: &str) -> StoreResult<Option<Credentials>>;

    /// Case-insensitive substring match on username, ordered by username.
    fn search_users(&self, query: &str) -> StoreResult<Vec<UserRecord>>;
}

pub trait FriendRequestStore {
    /// Atomically records a new pending request for the request's pair.
    ///
    /// Fails with `Conflict` if a pending or accepted request already exists for
    /// the unordered pair. A rejected request for the pair is replaced.
    fn open_friend_request(&self, request: &FriendRequest) -> StoreResult<()>;

    fn friend_request(&self, id: Uuid) -> StoreResult<Option<FriendRequest>>;

    fn friend_request_between(&self, a: Uuid, b: Uuid) -> StoreResult<Option<FriendRequest>>;

    /// Every request touching `user_id`, on either side, in any status.
    fn friend_requests_for(&self, user_id: Uuid) -> StoreResult<Vec<FriendRequest>>;

    /// Pending requests addressed to `user_id`, oldest first.
    fn incoming_pending(&self, user_id: Uuid) -> StoreResult<Vec<FriendRequest>>;

    /// Moves a pending request to `status`. Returns `None` if the request does not
    /// exist or is no longer pending; the check and the write are one step.
    fn resolve_friend_request(
        &self,
        id: Uuid,
        status: FriendRequestStatus,
        responded_at: DateTime<Utc>,
    ) -> StoreResult<Option<FriendRequest>>;
}

pub trait MessageStore {
    fn insert_message(&self, message: &Message) -> StoreResult<()>;

    /// Both directions of the conversation, oldest first. Ties keep insertion order.
    fn messages_between(&self, a: Uuid, b: Uuid) -> StoreResult<Vec<Message>>;
}

/// Everything the services need from storage.
pub trait Store: IdentityStore + FriendRequestStore + MessageStore + Send + Sync {}

impl<T> Store for T where T: IdentityStore + FriendRequestStore + MessageStore + Send + Sync {}
