use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use hearth_types::api::{Claims, SendMessageRequest};

use crate::blocking;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /messages/send
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let message = blocking(move || {
        state
            .messaging
            .send_message(claims.sub, req.target_id, &req.content)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /messages/{friend_id}: the whole conversation, oldest first. Clients poll this.
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(friend_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = blocking(move || state.messaging.conversation(claims.sub, friend_id)).await?;
    Ok(Json(messages))
}
