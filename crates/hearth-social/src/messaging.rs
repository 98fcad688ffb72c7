use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use hearth_db::Store;
use hearth_types::models::Message;

use crate::error::{SocialError, SocialResult};
use crate::now;
use crate::relationships::RelationshipEngine;

/// Longest accepted message body, in characters, after trimming.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Direct messages between confirmed friends. Friendship is the only gate,
/// for reads and writes alike.
#[derive(Clone)]
pub struct MessagingGateway {
    store: Arc<dyn Store>,
    relationships: RelationshipEngine,
}

impl MessagingGateway {
    pub fn new(store: Arc<dyn Store>, relationships: RelationshipEngine) -> Self {
        Self {
            store,
            relationships,
        }
    }

    pub fn is_friend(&self, a: Uuid, b: Uuid) -> SocialResult<bool> {
        self.relationships.are_friends(a, b)
    }

    pub fn send_message(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        content: &str,
    ) -> SocialResult<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SocialError::InvalidArgument("message content is empty".into()));
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(SocialError::InvalidArgument(format!(
                "message content exceeds {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        if self.store.user_by_id(target_id)?.is_none() {
            return Err(SocialError::NotFound("user not found".into()));
        }

        if !self.is_friend(actor_id, target_id)? {
            warn!(from = %actor_id, to = %target_id, "Refused message between non-friends");
            return Err(SocialError::Forbidden("you can only message your friends".into()));
        }

        let message = Message {
            id: Uuid::new_v4(),
            from_user_id: actor_id,
            to_user_id: target_id,
            content: content.to_string(),
            created_at: now(),
        };
        self.store.insert_message(&message)?;

        info!(message_id = %message.id, from = %actor_id, to = %target_id, "Message stored");
        Ok(message)
    }

    /// Full history with `target_id`, oldest first. Same result from either side.
    pub fn conversation(&self, actor_id: Uuid, target_id: Uuid) -> SocialResult<Vec<Message>> {
        if !self.is_friend(actor_id, target_id)? {
            return Err(SocialError::Forbidden(
                "you can only read conversations with your friends".into(),
            ));
        }
        Ok(self.store.messages_between(actor_id, target_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{store, user};
    use hearth_types::models::RespondAction;

    fn befriend(engine: &RelationshipEngine, a: Uuid, b: Uuid) {
        let request = engine.send_request(a, b).unwrap();
        engine.respond(b, request.id, RespondAction::Accept).unwrap();
    }

    #[test]
    fn friends_can_exchange_messages() {
        let store = store();
        let relationships = RelationshipEngine::new(store.clone());
        let gateway = MessagingGateway::new(store.clone(), relationships.clone());
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        befriend(&relationships, alice.id, bob.id);

        let sent = gateway.send_message(alice.id, bob.id, "  hi  ").unwrap();
        assert_eq!(sent.content, "hi");
        assert_eq!(sent.from_user_id, alice.id);

        let reply = gateway.send_message(bob.id, alice.id, "hello back").unwrap();

        let seen_by_bob = gateway.conversation(bob.id, alice.id).unwrap();
        let seen_by_alice = gateway.conversation(alice.id, bob.id).unwrap();
        assert_eq!(seen_by_bob, vec![sent, reply]);
        assert_eq!(seen_by_alice, seen_by_bob);
        assert!(seen_by_bob.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn strangers_are_forbidden_to_write_or_read() {
        let store = store();
        let relationships = RelationshipEngine::new(store.clone());
        let gateway = MessagingGateway::new(store.clone(), relationships.clone());
        let carol = user(&store, "carol");
        let dave = user(&store, "dave");

        assert!(matches!(
            gateway.send_message(carol.id, dave.id, "hey"),
            Err(SocialError::Forbidden(_))
        ));
        assert!(matches!(
            gateway.conversation(carol.id, dave.id),
            Err(SocialError::Forbidden(_))
        ));

        // a pending request is not friendship
        relationships.send_request(carol.id, dave.id).unwrap();
        assert!(matches!(
            gateway.send_message(dave.id, carol.id, "hey"),
            Err(SocialError::Forbidden(_))
        ));
    }

    #[test]
    fn rejected_pair_stays_forbidden() {
        let store = store();
        let relationships = RelationshipEngine::new(store.clone());
        let gateway = MessagingGateway::new(store.clone(), relationships.clone());
        let carol = user(&store, "carol");
        let dave = user(&store, "dave");

        let request = relationships.send_request(carol.id, dave.id).unwrap();
        relationships.respond(dave.id, request.id, RespondAction::Reject).unwrap();

        assert!(!gateway.is_friend(carol.id, dave.id).unwrap());
        assert!(matches!(
            gateway.send_message(carol.id, dave.id, "please"),
            Err(SocialError::Forbidden(_))
        ));
    }

    #[test]
    fn content_is_validated_before_anything_else() {
        let store = store();
        let gateway = MessagingGateway::new(store.clone(), RelationshipEngine::new(store.clone()));
        let alice = user(&store, "alice");

        assert!(matches!(
            gateway.send_message(alice.id, Uuid::new_v4(), " \n\t "),
            Err(SocialError::InvalidArgument(_))
        ));

        let too_long = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(matches!(
            gateway.send_message(alice.id, Uuid::new_v4(), &too_long),
            Err(SocialError::InvalidArgument(_))
        ));

        assert!(matches!(
            gateway.send_message(alice.id, Uuid::new_v4(), "hi"),
            Err(SocialError::NotFound(_))
        ));
    }

    #[test]
    fn messaging_yourself_is_forbidden() {
        let store = store();
        let gateway = MessagingGateway::new(store.clone(), RelationshipEngine::new(store.clone()));
        let alice = user(&store, "alice");

        assert!(matches!(
            gateway.send_message(alice.id, alice.id, "note to self"),
            Err(SocialError::Forbidden(_))
        ));
    }
}
