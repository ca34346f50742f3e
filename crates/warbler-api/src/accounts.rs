use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::json;

use warbler_db::models::UserRow;
use warbler_types::api::{ProfileResponse, ProfileStats};
use warbler_types::models::{Account, Message};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::messages::message_from_row;
use crate::session::CurrentUser;
use crate::sqlite_timestamp;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub q: Option<String>,
}

pub(crate) fn account_from_row(row: UserRow) -> Account {
    Account {
        id: row.id,
        username: row.username,
        email: row.email,
        image_url: row.image_url,
        header_image_url: row.header_image_url,
        bio: row.bio,
        location: row.location,
        created_at: sqlite_timestamp(&row.created_at),
    }
}

/// List all accounts, or those whose username matches `?q=`.
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let rows = tokio::task::spawn_blocking(move || state.db.list_users(query.q.as_deref()))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {e}")))??;

    Ok(Json(rows.into_iter().map(account_from_row).collect()))
}

/// Profile page data: the account, its aggregate counts, and its messages
/// newest first.
pub async fn show_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (user, stats, messages) = tokio::task::spawn_blocking(move || {
        let Some(user) = state.db.get_user_by_id(user_id)? else {
            return Ok(None);
        };
        let stats = state.db.user_stats(user_id)?;
        let messages = state.db.user_messages(user_id)?;
        Ok::<_, anyhow::Error>(Some((user, stats, messages)))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {e}")))??
    .ok_or(ApiError::NotFound)?;

    Ok(Json(ProfileResponse {
        account: account_from_row(user),
        stats: ProfileStats {
            messages: stats.messages,
            following: stats.following,
            followers: stats.followers,
            likes: stats.likes,
        },
        messages: messages.into_iter().map(message_from_row).collect(),
    }))
}

pub async fn following(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(_current): Extension<CurrentUser>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let rows = user_list(state, user_id, |db, id| db.following_of(id)).await?;
    Ok(Json(rows.into_iter().map(account_from_row).collect()))
}

pub async fn followers(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(_current): Extension<CurrentUser>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let rows = user_list(state, user_id, |db, id| db.followers_of(id)).await?;
    Ok(Json(rows.into_iter().map(account_from_row).collect()))
}

/// Messages the account has liked, in like order.
pub async fn likes(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(_current): Extension<CurrentUser>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let rows = user_list(state, user_id, |db, id| db.liked_messages(id)).await?;
    Ok(Json(rows.into_iter().map(message_from_row).collect()))
}

/// Shared shape of the graph views: 404 for an unknown account, then a
/// list query against it.
async fn user_list<T, F>(state: AppState, user_id: i64, f: F) -> Result<Vec<T>, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&warbler_db::Database, i64) -> anyhow::Result<Vec<T>> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        if state.db.get_user_by_id(user_id)?.is_none() {
            return Ok(None);
        }
        f(&state.db, user_id).map(Some)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {e}")))??
    .ok_or(ApiError::NotFound)
}

/// Create a follow edge from the current account to `user_id`. A duplicate
/// edge violates the pair's uniqueness and surfaces as an integrity error.
pub async fn follow(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.db.get_user_by_id(user_id)?.is_none() {
        return Err(ApiError::NotFound);
    }

    state.db.follow(current.id, user_id)?;
    Ok(Json(json!({ "following": true })))
}

pub async fn stop_following(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.db.get_user_by_id(user_id)?.is_none() {
        return Err(ApiError::NotFound);
    }

    state.db.unfollow(current.id, user_id)?;
    Ok(Json(json!({ "following": false })))
}
