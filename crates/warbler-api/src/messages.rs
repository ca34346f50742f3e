use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use warbler_db::models::MessageRow;
use warbler_types::api::NewMessageRequest;
use warbler_types::models::Message;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::session::CurrentUser;
use crate::sqlite_timestamp;

/// Maximum message length, matching the classic 140-character post limit.
const MESSAGE_MAX_LEN: usize = 140;

pub(crate) fn message_from_row(row: MessageRow) -> Message {
    Message {
        id: row.id,
        user_id: row.user_id,
        username: row.username,
        text: row.text,
        created_at: sqlite_timestamp(&row.created_at),
    }
}

pub async fn new_message(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<NewMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::Validation("message text must not be empty".into()));
    }
    if text.chars().count() > MESSAGE_MAX_LEN {
        return Err(ApiError::Validation(format!(
            "message text exceeds {MESSAGE_MAX_LEN} characters"
        )));
    }

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let message = tokio::task::spawn_blocking(move || {
        let id = db.db.insert_message(current.id, &text)?;
        db.db.get_message(id)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {e}")))??
    .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("message missing after insert")))?;

    Ok((StatusCode::CREATED, Json(message_from_row(message))))
}

pub async fn show_message(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
) -> Result<Json<Message>, ApiError> {
    let message = state.db.get_message(message_id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(message_from_row(message)))
}

/// Owner-only delete. A non-owner gets an authorization failure and the
/// message stays.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let message = state.db.get_message(message_id)?.ok_or(ApiError::NotFound)?;
    if message.user_id != current.id {
        return Err(ApiError::Unauthorized);
    }

    state.db.delete_message(message_id)?;
    Ok(Json(json!({ "deleted": true })))
}

/// Toggle a like edge on the message. Duplicate likes cannot exist; the
/// second call removes the edge instead.
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let message = state.db.get_message(message_id)?.ok_or(ApiError::NotFound)?;
    if message.user_id == current.id {
        return Err(ApiError::Validation("cannot like your own message".into()));
    }

    let liked = state.db.toggle_like(current.id, message_id)?;
    Ok(Json(json!({ "liked": liked })))
}

/// Most recent messages from the current account and the accounts it
/// follows.
pub async fn home_timeline(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let rows = tokio::task::spawn_blocking(move || state.db.timeline(current.id, 100))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {e}")))??;

    Ok(Json(rows.into_iter().map(message_from_row).collect()))
}
