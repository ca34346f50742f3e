pub mod accounts;
pub mod auth;
pub mod error;
pub mod messages;
pub mod session;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use crate::auth::AppState;

/// Assemble the application routes. Outer layers (CORS, request tracing)
/// are added by the binary.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/users", get(accounts::list_users))
        .route("/users/{user_id}", get(accounts::show_user))
        .route("/messages/{message_id}", get(messages::show_message))
        .with_state(state.clone());

    let gated = Router::new()
        .route("/logout", post(auth::logout))
        .route("/home", get(messages::home_timeline))
        .route("/users/{user_id}/following", get(accounts::following))
        .route("/users/{user_id}/followers", get(accounts::followers))
        .route("/users/{user_id}/likes", get(accounts::likes))
        .route("/users/follow/{user_id}", post(accounts::follow))
        .route("/users/stop-following/{user_id}", post(accounts::stop_following))
        .route("/users/delete", post(auth::delete_account))
        .route("/messages/new", post(messages::new_message))
        .route("/messages/{message_id}/delete", post(messages::delete_message))
        .route("/messages/{message_id}/like", post(messages::toggle_like))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ))
        .with_state(state);

    Router::new().merge(public).merge(gated)
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert, falling back through RFC 3339 first.
pub(crate) fn sqlite_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}
