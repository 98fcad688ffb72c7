use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::{CookieJar, WithRejection};
use chrono::{SubsecRound, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use hearth_db::StoreError;
use hearth_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use hearth_types::models::{UserProfile, UserRecord};

use crate::blocking;
use crate::error::ApiError;
use crate::session::{removal_cookie, session_cookie};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

const EMAIL_TAKEN: &str = "email is already registered";
const USERNAME_TAKEN: &str = "username is already taken";

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    // Validate input
    let name_len = username.chars().count();
    if !(3..=32).contains(&name_len) || username.contains(char::is_whitespace) {
        return Err(ApiError::invalid_argument(
            "username must be 3-32 characters without spaces",
        ));
    }
    if !is_plausible_email(&email) {
        return Err(ApiError::invalid_argument("email address is not valid"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::invalid_argument(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let db = state.clone();
    let password = req.password;
    let profile = blocking(move || {
        if db.store.user_by_email(&email)?.is_some() {
            return Err(ApiError::conflict(EMAIL_TAKEN));
        }
        if db.store.user_by_username(&username)?.is_some() {
            return Err(ApiError::conflict(USERNAME_TAKEN));
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| ApiError::internal(format!("password hashing failed: {}", e)))?
            .to_string();

        let user = UserRecord {
            id: Uuid::new_v4(),
            username,
            email,
            created_at: Utc::now().trunc_subsecs(6),
        };
        // a concurrent registration can still win between the checks and the insert
        db.store
            .create_user(&user, &password_hash)
            .map_err(registration_error)?;

        info!(user_id = %user.id, "Registered user {}", user.username);
        Ok(user.profile())
    })
    .await?;

    let token = state
        .sessions
        .issue(&profile)
        .map_err(|e| ApiError::internal(format!("token encoding failed: {}", e)))?;

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token.clone())),
        Json(AuthResponse { user: profile, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let email = req.email.trim().to_lowercase();
    let password = req.password;

    let profile = blocking(move || {
        let rejected = || ApiError::unauthenticated("invalid email or password");

        let creds = db.store.credentials_by_email(&email)?.ok_or_else(rejected)?;

        // Verify password
        let parsed_hash = PasswordHash::new(&creds.password_hash)
            .map_err(|e| ApiError::internal(format!("stored hash unreadable: {}", e)))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| rejected())?;

        Ok::<_, ApiError>(creds.user.profile())
    })
    .await?;

    let token = state
        .sessions
        .issue(&profile)
        .map_err(|e| ApiError::internal(format!("token encoding failed: {}", e)))?;

    Ok((
        jar.add(session_cookie(token.clone())),
        Json(AuthResponse { user: profile, token }),
    ))
}

/// Bearer tokens stay valid until they expire; only the cookie is cleared.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.add(removal_cookie()), Json(json!({ "status": "logged_out" })))
}

pub async fn me(Extension(claims): Extension<Claims>) -> Json<UserProfile> {
    Json(UserProfile {
        id: claims.sub,
        username: claims.username,
        email: claims.email,
    })
}

fn registration_error(e: StoreError) -> ApiError {
    match e {
        StoreError::Conflict(detail) if detail.contains("users.email") => {
            ApiError::conflict(EMAIL_TAKEN)
        }
        StoreError::Conflict(detail) if detail.contains("users.username") => {
            ApiError::conflict(USERNAME_TAKEN)
        }
        StoreError::Conflict(_) => ApiError::conflict("account already exists"),
        other => other.into(),
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_types::api::ErrorKind;

    #[test]
    fn email_check_is_shallow_but_strict_on_shape() {
        assert!(is_plausible_email("alice@example.com"));
        assert!(!is_plausible_email("alice"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("alice@"));
        assert!(!is_plausible_email("a@b@c"));
        assert!(!is_plausible_email("al ice@example.com"));
    }

    #[test]
    fn lost_registration_races_read_like_the_prechecks() {
        let email = registration_error(StoreError::Conflict(
            "UNIQUE constraint failed: users.email".into(),
        ));
        assert_eq!(email.kind(), ErrorKind::Conflict);
        assert_eq!(email.message(), EMAIL_TAKEN);

        let username = registration_error(StoreError::Conflict(
            "UNIQUE constraint failed: users.username".into(),
        ));
        assert_eq!(username.message(), USERNAME_TAKEN);

        let id = registration_error(StoreError::Conflict("UNIQUE constraint failed: users.id".into()));
        assert_eq!(id.kind(), ErrorKind::Conflict);
        assert!(!id.message().contains("UNIQUE"));

        let backend = registration_error(StoreError::Backend("disk I/O error".into()));
        assert_eq!(backend.kind(), ErrorKind::Internal);
        assert!(!backend.message().contains("disk"));
    }
}
