use std::sync::Arc;

use chrono::Duration;

use hearth_db::Store;
use hearth_social::{MessagingGateway, RelationshipEngine};

use crate::session::SessionKeys;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<dyn Store>,
    pub relationships: RelationshipEngine,
    pub messaging: MessagingGateway,
    pub sessions: SessionKeys,
}

impl AppStateInner {
    pub fn new(store: Arc<dyn Store>, jwt_secret: &str, session_ttl: Duration) -> AppState {
        let relationships = RelationshipEngine::new(store.clone());
        let messaging = MessagingGateway::new(store.clone(), relationships.clone());
        Arc::new(Self {
            store,
            relationships,
            messaging,
            sessions: SessionKeys::new(jwt_secret, session_ttl),
        })
    }
}
