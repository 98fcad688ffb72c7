use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use hearth_types::models::{FriendRequest, FriendRequestStatus, Message, PairKey, UserRecord};

use crate::models::{Credentials, fold_username};
use crate::store::{FriendRequestStore, IdentityStore, MessageStore, StoreError, StoreResult};

/// In-process store with the same contract as the SQLite engine.
/// Every operation runs under one lock, so conditional writes are atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    users: Vec<Credentials>,
    friend_requests: Vec<FriendRequest>,
    messages: Vec<Message>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| StoreError::Backend(format!("memory store lock poisoned: {}", e)))
    }
}

impl IdentityStore for MemoryStore {
    fn create_user(&self, user: &UserRecord, password_hash: &str) -> StoreResult<()> {
        let mut state = self.lock()?;
        if let Some(taken) = state.users.iter().find(|c| {
            c.user.id == user.id || c.user.username == user.username || c.user.email == user.email
        }) {
            let field = if taken.user.id == user.id {
                "users.id"
            } else if taken.user.username == user.username {
                "users.username"
            } else {
                "users.email"
            };
            return Err(StoreError::Conflict(format!("UNIQUE constraint failed: {}", field)));
        }

        state.users.push(Credentials {
            user: user.clone(),
            password_hash: password_hash.to_string(),
        });
        Ok(())
    }

    fn user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|c| c.user.id == id).map(|c| c.user.clone()))
    }

    fn user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|c| c.user.email == email).map(|c| c.user.clone()))
    }

    fn user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let state = self.lock()?;
        Ok(state
            .users
            .iter()
            .find(|c| c.user.username == username)
            .map(|c| c.user.clone()))
    }

    fn credentials_by_email(&self, email: &str) -> StoreResult<Option<Credentials>> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|c| c.user.email == email).cloned())
    }

    fn search_users(&self, query: &str) -> StoreResult<Vec<UserRecord>> {
        let needle = fold_username(query);
        let state = self.lock()?;
        let mut found: Vec<UserRecord> = state
            .users
            .iter()
            .filter(|c| fold_username(&c.user.username).contains(&needle))
            .map(|c| c.user.clone())
            .collect();
        found.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(found)
    }
}

impl FriendRequestStore for MemoryStore {
    fn open_friend_request(&self, request: &FriendRequest) -> StoreResult<()> {
        let pair = request.pair();
        let mut state = self.lock()?;

        if let Some(existing) = state.friend_requests.iter().find(|r| r.pair() == pair) {
            if existing.status != FriendRequestStatus::Rejected {
                return Err(StoreError::Conflict(
                    "UNIQUE constraint failed: friend_requests.user_low, friend_requests.user_high"
                        .into(),
                ));
            }
        }

        state.friend_requests.retain(|r| r.pair() != pair);
        state.friend_requests.push(request.clone());
        Ok(())
    }

    fn friend_request(&self, id: Uuid) -> StoreResult<Option<FriendRequest>> {
        let state = self.lock()?;
        Ok(state.friend_requests.iter().find(|r| r.id == id).cloned())
    }

    fn friend_request_between(&self, a: Uuid, b: Uuid) -> StoreResult<Option<FriendRequest>> {
        let pair = PairKey::new(a, b);
        let state = self.lock()?;
        Ok(state.friend_requests.iter().find(|r| r.pair() == pair).cloned())
    }

    fn friend_requests_for(&self, user_id: Uuid) -> StoreResult<Vec<FriendRequest>> {
        let state = self.lock()?;
        let mut requests: Vec<FriendRequest> = state
            .friend_requests
            .iter()
            .filter(|r| r.pair().contains(user_id))
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    fn incoming_pending(&self, user_id: Uuid) -> StoreResult<Vec<FriendRequest>> {
        let state = self.lock()?;
        let mut pending: Vec<FriendRequest> = state
            .friend_requests
            .iter()
            .filter(|r| r.to_user_id == user_id && r.status == FriendRequestStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }

    fn resolve_friend_request(
        &self,
        id: Uuid,
        status: FriendRequestStatus,
        responded_at: DateTime<Utc>,
    ) -> StoreResult<Option<FriendRequest>> {
        let mut state = self.lock()?;
        let Some(request) = state
            .friend_requests
            .iter_mut()
            .find(|r| r.id == id && r.status == FriendRequestStatus::Pending)
        else {
            return Ok(None);
        };

        request.status = status;
        request.responded_at = Some(responded_at);
        Ok(Some(request.clone()))
    }
}

impl MessageStore for MemoryStore {
    fn insert_message(&self, message: &Message) -> StoreResult<()> {
        let mut state = self.lock()?;
        if state.messages.iter().any(|m| m.id == message.id) {
            return Err(StoreError::Conflict("UNIQUE constraint failed: messages.id".into()));
        }
        state.messages.push(message.clone());
        Ok(())
    }

    fn messages_between(&self, a: Uuid, b: Uuid) -> StoreResult<Vec<Message>> {
        let pair = PairKey::new(a, b);
        let state = self.lock()?;
        let mut conversation: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.pair() == pair)
            .cloned()
            .collect();
        // stable sort keeps insertion order for equal timestamps
        conversation.sort_by_key(|m| m.created_at);
        Ok(conversation)
    }
}
