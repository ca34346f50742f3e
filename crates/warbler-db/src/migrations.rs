use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                  INTEGER PRIMARY KEY,
            username            TEXT NOT NULL UNIQUE,
            email               TEXT NOT NULL UNIQUE,
            password            TEXT NOT NULL,
            image_url           TEXT NOT NULL DEFAULT '/static/images/default-pic.png',
            header_image_url    TEXT NOT NULL DEFAULT '/static/images/warbler-hero.jpg',
            bio                 TEXT,
            location            TEXT,
            created_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            text        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_user
            ON messages(user_id, created_at);

        CREATE TABLE IF NOT EXISTS follows (
            follower_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            followed_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (follower_id, followed_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_followed
            ON follows(followed_id);

        CREATE TABLE IF NOT EXISTS likes (
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            message_id  INTEGER NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_id, message_id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_message
            ON likes(message_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
