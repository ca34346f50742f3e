use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use warbler_db::Database;
use warbler_db::models::UserRow;
use warbler_types::api::{AuthResponse, LoginRequest, SignupRequest};

use crate::accounts::account_from_row;
use crate::error::ApiError;
use crate::session::{self, CurrentUser};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub session_secret: String,
}

/// Hash with Argon2id. An empty password is rejected here, before anything
/// reaches storage.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    if password.is_empty() {
        return Err(ApiError::Validation(
            "password must be a non-empty string".into(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {e}")))?
        .to_string();

    Ok(hash)
}

pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Look up by username and verify the password. Returns `None` for an
/// unknown username and for a wrong password alike, so callers cannot tell
/// which field was wrong.
pub fn authenticate(
    db: &Database,
    username: &str,
    password: &str,
) -> anyhow::Result<Option<UserRow>> {
    match db.get_user_by_username(username)? {
        Some(user) if verify_password(&user.password, password) => Ok(Some(user)),
        _ => Ok(None),
    }
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let password_hash = hash_password(&req.password)?;

    let user_id = state
        .db
        .create_user(
            Some(&req.username),
            Some(&req.email),
            &password_hash,
            req.image_url.as_deref(),
        )
        .map_err(|e| {
            if warbler_db::is_constraint_violation(&e) {
                ApiError::Integrity("Username or email already taken".into())
            } else {
                ApiError::Internal(e)
            }
        })?;

    let user = state
        .db
        .get_user_by_id(user_id)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("user {user_id} missing after insert")))?;

    let token = session::create_token(&state.session_secret, user.id, &user.username)?;
    let jar = jar.add(session::session_cookie(token.clone()));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            account: account_from_row(user),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = authenticate(&state.db, &req.username, &req.password)?
        .ok_or(ApiError::Unauthorized)?;

    let token = session::create_token(&state.session_secret, user.id, &user.username)?;
    let jar = jar.add(session::session_cookie(token.clone()));

    Ok((
        jar,
        Json(AuthResponse {
            account: account_from_row(user),
            token,
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(session::expired_session_cookie());
    (jar, Json(json!({ "ok": true })))
}

/// Delete the current account. Messages and graph edges cascade in storage.
pub async fn delete_account(
    State(state): State<AppState>,
    jar: CookieJar,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.delete_user(current.id)?;

    let jar = jar.remove(session::expired_session_cookie());
    Ok((jar, Json(json!({ "ok": true }))))
}
