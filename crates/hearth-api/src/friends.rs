use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;

use hearth_types::api::{Claims, FriendRequestBody, RespondRequest};
use hearth_types::models::RespondAction;

use crate::blocking;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /friends/request: open a pending request to `target_id`.
pub async fn send_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<FriendRequestBody>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let request =
        blocking(move || state.relationships.send_request(claims.sub, req.target_id)).await?;

    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /friends/requests: pending requests addressed to the caller.
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let pending = blocking(move || state.relationships.incoming_requests(claims.sub)).await?;
    Ok(Json(pending))
}

/// POST /friends/respond: accept or reject a request addressed to the caller.
pub async fn respond(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<RespondRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let action: RespondAction = req
        .action
        .parse()
        .map_err(|e| ApiError::invalid_argument(format!("{}", e)))?;

    let updated =
        blocking(move || state.relationships.respond(claims.sub, req.request_id, action)).await?;

    Ok(Json(updated))
}

/// GET /friends
pub async fn list_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let friends = blocking(move || state.relationships.friends(claims.sub)).await?;
    Ok(Json(friends))
}
