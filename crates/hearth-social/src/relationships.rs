use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use hearth_db::{Store, StoreError};
use hearth_types::models::{
    FriendRequest, FriendRequestStatus, PendingRequest, RespondAction, UserProfile,
};

use crate::error::{SocialError, SocialResult};
use crate::now;

/// Owns the friend-request lifecycle: pending, then accepted or rejected, once.
///
/// A rejected pair may be requested again by either side; the rejected record is
/// replaced by a fresh pending one rather than reopened.
#[derive(Clone)]
pub struct RelationshipEngine {
    store: Arc<dyn Store>,
}

impl RelationshipEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn send_request(&self, actor_id: Uuid, target_id: Uuid) -> SocialResult<FriendRequest> {
        if actor_id == target_id {
            return Err(SocialError::InvalidArgument(
                "cannot send a friend request to yourself".into(),
            ));
        }

        if self.store.user_by_id(target_id)?.is_none() {
            return Err(SocialError::NotFound("user not found".into()));
        }

        let request = FriendRequest::pending(actor_id, target_id, now());
        match self.store.open_friend_request(&request) {
            Ok(()) => {
                info!(request_id = %request.id, from = %actor_id, to = %target_id, "Friend request opened");
                Ok(request)
            }
            Err(StoreError::Conflict(_)) => {
                let existing = self.store.friend_request_between(actor_id, target_id)?;
                let message = match existing.map(|r| r.status) {
                    Some(FriendRequestStatus::Accepted) => "you are already friends",
                    _ => "a friend request between you is already pending",
                };
                Err(SocialError::Conflict(message.into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pending requests addressed to `user_id`, each with its initiator's profile.
    pub fn incoming_requests(&self, user_id: Uuid) -> SocialResult<Vec<PendingRequest>> {
        let requests = self.store.incoming_pending(user_id)?;

        let mut pending = Vec::with_capacity(requests.len());
        for request in requests {
            match self.store.user_by_id(request.from_user_id)? {
                Some(from) => pending.push(PendingRequest {
                    from_user: from.profile(),
                    request,
                }),
                None => warn!(
                    "Friend request {} references missing user {}",
                    request.id, request.from_user_id
                ),
            }
        }
        Ok(pending)
    }

    /// Only the recipient may answer, and only while the request is pending.
    pub fn respond(
        &self,
        actor_id: Uuid,
        request_id: Uuid,
        action: RespondAction,
    ) -> SocialResult<FriendRequest> {
        let request = self
            .store
            .friend_request(request_id)?
            .ok_or_else(|| SocialError::NotFound("friend request not found".into()))?;

        if request.to_user_id != actor_id {
            warn!(%request_id, %actor_id, "Refused response from non-recipient");
            return Err(SocialError::Forbidden(
                "only the recipient can respond to a friend request".into(),
            ));
        }

        if request.status.is_terminal() {
            return Err(SocialError::Conflict(format!(
                "friend request was already {}",
                request.status
            )));
        }

        let status = action.resulting_status();
        let updated = self
            .store
            .resolve_friend_request(request_id, status, now())?
            // lost a race with a concurrent response
            .ok_or_else(|| SocialError::Conflict("friend request was already answered".into()))?;

        info!(%request_id, %status, "Friend request resolved");
        Ok(updated)
    }

    pub fn friends(&self, user_id: Uuid) -> SocialResult<Vec<UserProfile>> {
        let mut friends = Vec::new();
        for request in self.store.friend_requests_for(user_id)? {
            if request.status != FriendRequestStatus::Accepted {
                continue;
            }
            let Some(friend_id) = request.other_party(user_id) else {
                continue;
            };
            match self.store.user_by_id(friend_id)? {
                Some(friend) => friends.push(friend.profile()),
                None => warn!("Friendship {} references missing user {}", request.id, friend_id),
            }
        }
        Ok(friends)
    }

    /// Users whose name contains `query`, minus the actor and anyone the actor
    /// already has a pending or accepted request with.
    pub fn search_candidates(&self, actor_id: Uuid, query: &str) -> SocialResult<Vec<UserProfile>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let related: HashMap<Uuid, FriendRequestStatus> = self
            .store
            .friend_requests_for(actor_id)?
            .into_iter()
            .filter_map(|r| r.other_party(actor_id).map(|other| (other, r.status)))
            .collect();

        Ok(self
            .store
            .search_users(query)?
            .into_iter()
            .filter(|user| user.id != actor_id)
            .filter(|user| match related.get(&user.id) {
                None | Some(FriendRequestStatus::Rejected) => true,
                Some(_) => false,
            })
            .map(|user| user.profile())
            .collect())
    }

    /// True iff an accepted request exists for the unordered pair.
    pub fn are_friends(&self, a: Uuid, b: Uuid) -> SocialResult<bool> {
        if a == b {
            return Ok(false);
        }
        Ok(self
            .store
            .friend_request_between(a, b)?
            .is_some_and(|r| r.status == FriendRequestStatus::Accepted))
    }

    /// A user's profile, visible only to their friends.
    pub fn friend_profile(&self, actor_id: Uuid, target_id: Uuid) -> SocialResult<UserProfile> {
        let user = self
            .store
            .user_by_id(target_id)?
            .ok_or_else(|| SocialError::NotFound("user not found".into()))?;

        if !self.are_friends(actor_id, target_id)? {
            return Err(SocialError::Forbidden("you are not friends with this user".into()));
        }
        Ok(user.profile())
    }
}
