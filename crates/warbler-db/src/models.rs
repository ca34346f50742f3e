/// Database row types — these map directly to SQLite rows.
/// Distinct from warbler-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub text: String,
    pub created_at: String,
}

/// Per-user aggregate counts for the profile page.
pub struct UserStats {
    pub messages: i64,
    pub following: i64,
    pub followers: i64,
    pub likes: i64,
}
