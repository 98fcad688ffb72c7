use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, friends, messages, users};

/// Every route, with authentication applied to all but the public ones.
/// Transport layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/friends", get(friends::list_friends))
        .route("/friends/request", post(friends::send_request))
        .route("/friends/requests", get(friends::list_requests))
        .route("/friends/respond", post(friends::respond))
        .route("/users/search", get(users::search))
        .route("/users/{id}", get(users::get_user))
        .route("/messages/send", post(messages::send_message))
        .route("/messages/{friend_id}", get(messages::get_messages))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
