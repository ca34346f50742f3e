#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use warbler_api::auth::{AppState, AppStateInner};
use warbler_api::session;

pub const SESSION_SECRET: &str = "test-secret";

/// Fresh router over a fresh in-memory database. The state handle is
/// returned too so tests can seed and inspect storage directly.
pub fn app() -> (Router, AppState) {
    let db = warbler_db::Database::open_in_memory().unwrap();
    let state: AppState = Arc::new(AppStateInner {
        db,
        session_secret: SESSION_SECRET.into(),
    });
    (warbler_api::router(state.clone()), state)
}

pub fn seed_user(state: &AppState, username: &str, email: &str, password: &str) -> i64 {
    let hash = warbler_api::auth::hash_password(password).unwrap();
    state
        .db
        .create_user(Some(username), Some(email), &hash, None)
        .unwrap()
}

/// Cookie header value carrying a session for the given account id. The id
/// does not have to exist — the gate is expected to reject stale sessions.
pub fn session_for(id: i64, username: &str) -> String {
    let token = session::create_token(SESSION_SECRET, id, username).unwrap();
    format!("{}={}", session::SESSION_COOKIE, token)
}

pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

pub async fn post(app: &Router, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: Value,
    cookie: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub fn usernames(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|v| v["username"].as_str().unwrap().to_string())
        .collect()
}

pub fn error_message(body: &Value) -> &str {
    body["error"].as_str().unwrap_or("")
}
