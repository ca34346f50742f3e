use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account as rendered to clients. The password hash never leaves
/// the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
