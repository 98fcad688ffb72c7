use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use hearth_types::api::{Claims, SearchQuery};

use crate::blocking;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /users/search?q=: people the caller could send a request to.
pub async fn search(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Query(query), _): WithRejection<Query<SearchQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let q = query.q.unwrap_or_default();
    let users = blocking(move || state.relationships.search_candidates(claims.sub, &q)).await?;
    Ok(Json(users))
}

/// GET /users/{id}: a friend's profile.
pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = blocking(move || state.relationships.friend_profile(claims.sub, user_id)).await?;
    Ok(Json(profile))
}
