use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use tracing::warn;

use crate::blocking;
use crate::error::ApiError;
use crate::session::SESSION_COOKIE;
use crate::state::AppState;

/// Resolves the acting user from a bearer token or the session cookie and
/// stores their `Claims` in the request extensions. Tokens are stateless, so
/// the user they name is looked up again on every request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned);

    let token = match bearer {
        Some(token) => token,
        None => CookieJar::from_headers(req.headers())
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_owned())
            .ok_or_else(|| ApiError::unauthenticated("not authenticated"))?,
    };

    let claims = state
        .sessions
        .verify(&token)
        .map_err(|_| ApiError::unauthenticated("session is invalid or expired"))?;

    let store = state.store.clone();
    let user_id = claims.sub;
    if blocking(move || store.user_by_id(user_id)).await?.is_none() {
        warn!(%user_id, "Session names a user that no longer exists");
        return Err(ApiError::unauthenticated("session is invalid or expired"));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
