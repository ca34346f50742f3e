use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::auth::AppState;
use crate::error::ApiError;

/// Cookie under which the current account's session token travels.
pub const SESSION_COOKIE: &str = "warbler_session";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

/// Account resolved from the session, attached to gated requests as an
/// extension.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

pub fn create_token(secret: &str, user_id: i64, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .build()
}

/// Resolve the session cookie to an account and attach it to the request.
/// A missing cookie, an invalid or expired token, and a token whose account
/// no longer exists are all treated the same: not authenticated.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let jar = CookieJar::from_headers(req.headers());
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(ApiError::Unauthorized)?;

    let claims = decode_token(&state.session_secret, &token).ok_or(ApiError::Unauthorized)?;

    // Re-check the account row so a session naming a deleted or never
    // existing account fails the gate.
    let user = state
        .db
        .get_user_by_id(claims.sub)?
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        username: user.username,
    });
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip() {
        let token = create_token("secret", 1414, "tester").unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, 1414);
        assert_eq!(claims.username, "tester");
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = create_token("secret", 1414, "tester").unwrap();
        assert!(decode_token("other-secret", &token).is_none());
    }

    #[test]
    fn garbage_token_rejected() {
        assert!(decode_token("secret", "not-a-token").is_none());
    }
}
