use serde::{Deserialize, Serialize};

use crate::models::{Account, Message};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub account: Account,
    pub token: String,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileStats {
    pub messages: i64,
    pub following: i64,
    pub followers: i64,
    pub likes: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub account: Account,
    pub stats: ProfileStats,
    pub messages: Vec<Message>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewMessageRequest {
    pub text: String,
}
