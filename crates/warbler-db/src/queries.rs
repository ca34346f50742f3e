use crate::Database;
use crate::models::{MessageRow, UserRow, UserStats};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

const USER_COLS: &str =
    "id, username, email, password, image_url, header_image_url, bio, location, created_at";

impl Database {
    // -- Users --

    /// Insert an account row. `username` and `email` are nullable on purpose:
    /// the NOT NULL and UNIQUE constraints are enforced by the storage layer
    /// and surface as constraint violations, not as panics in this layer.
    pub fn create_user(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        password_hash: &str,
        image_url: Option<&str>,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            match image_url {
                Some(url) => conn.execute(
                    "INSERT INTO users (username, email, password, image_url)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![username, email, password_hash, url],
                )?,
                // Omit the column so the schema default applies
                None => conn.execute(
                    "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
                    params![username, email, password_hash],
                )?,
            };
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLS} FROM users WHERE username = ?1");
            let row = conn
                .prepare(&sql)?
                .query_row([username], map_user)
                .optional()?;
            Ok(row)
        })
    }

    /// All accounts, or those whose username contains `search`, ordered by id.
    pub fn list_users(&self, search: Option<&str>) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let rows = match search {
                Some(q) => {
                    let sql = format!(
                        "SELECT {USER_COLS} FROM users
                         WHERE username LIKE '%' || ?1 || '%' ORDER BY id"
                    );
                    conn.prepare(&sql)?
                        .query_map([q], map_user)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
                None => {
                    let sql = format!("SELECT {USER_COLS} FROM users ORDER BY id");
                    conn.prepare(&sql)?
                        .query_map([], map_user)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
    }

    /// Remove an account. Messages, follow edges and like edges cascade.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn user_stats(&self, id: i64) -> Result<UserStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM messages WHERE user_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE follower_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE followed_id = ?1),
                    (SELECT COUNT(*) FROM likes WHERE user_id = ?1)",
                [id],
                |row| {
                    Ok(UserStats {
                        messages: row.get(0)?,
                        following: row.get(1)?,
                        followers: row.get(2)?,
                        likes: row.get(3)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, user_id: i64, text: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (user_id, text) VALUES (?1, ?2)",
                params![user_id, text],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT m.id, m.user_id, u.username, m.text, m.created_at
                     FROM messages m
                     JOIN users u ON m.user_id = u.id
                     WHERE m.id = ?1",
                )?
                .query_row([id], map_message)
                .optional()?;
            Ok(row)
        })
    }

    /// Messages authored by one account, newest first.
    pub fn user_messages(&self, user_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let rows = conn
                .prepare(
                    "SELECT m.id, m.user_id, u.username, m.text, m.created_at
                     FROM messages m
                     JOIN users u ON m.user_id = u.id
                     WHERE m.user_id = ?1
                     ORDER BY m.created_at DESC, m.id DESC",
                )?
                .query_map([user_id], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_message(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    /// Feed for one viewer: their own messages plus those of accounts they
    /// follow, newest first.
    pub fn timeline(&self, viewer_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let rows = conn
                .prepare(
                    "SELECT m.id, m.user_id, u.username, m.text, m.created_at
                     FROM messages m
                     JOIN users u ON m.user_id = u.id
                     WHERE m.user_id = ?1
                        OR m.user_id IN
                           (SELECT followed_id FROM follows WHERE follower_id = ?1)
                     ORDER BY m.created_at DESC, m.id DESC
                     LIMIT ?2",
                )?
                .query_map(params![viewer_id, limit], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Follow edges --

    /// Duplicate edges violate the primary key and surface as a constraint
    /// error.
    pub fn follow(&self, follower_id: i64, followed_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO follows (follower_id, followed_id) VALUES (?1, ?2)",
                params![follower_id, followed_id],
            )?;
            Ok(())
        })
    }

    pub fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                params![follower_id, followed_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM follows WHERE follower_id = ?1 AND followed_id = ?2)",
                params![follower_id, followed_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    pub fn is_followed_by(&self, user_id: i64, follower_id: i64) -> Result<bool> {
        self.is_following(follower_id, user_id)
    }

    /// Accounts `user_id` follows, in the order the edges were created.
    pub fn following_of(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}
                 FROM follows f
                 JOIN users u ON u.id = f.followed_id
                 WHERE f.follower_id = ?1
                 ORDER BY f.rowid",
                user_cols("u")
            );
            let rows = conn
                .prepare(&sql)?
                .query_map([user_id], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Accounts following `user_id`, in the order the edges were created.
    pub fn followers_of(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}
                 FROM follows f
                 JOIN users u ON u.id = f.follower_id
                 WHERE f.followed_id = ?1
                 ORDER BY f.rowid",
                user_cols("u")
            );
            let rows = conn
                .prepare(&sql)?
                .query_map([user_id], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Like edges --

    /// Toggle a like: removes the edge if present, inserts it if not.
    /// Returns true when the message is liked after the call.
    pub fn toggle_like(&self, user_id: i64, message_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT rowid FROM likes WHERE user_id = ?1 AND message_id = ?2",
                    params![user_id, message_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(rowid) = existing {
                conn.execute("DELETE FROM likes WHERE rowid = ?1", [rowid])?;
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                    params![user_id, message_id],
                )?;
                Ok(true)
            }
        })
    }

    /// Messages an account has liked, in the order the likes were created.
    pub fn liked_messages(&self, user_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let rows = conn
                .prepare(
                    "SELECT m.id, m.user_id, u.username, m.text, m.created_at
                     FROM likes l
                     JOIN messages m ON m.id = l.message_id
                     JOIN users u ON u.id = m.user_id
                     WHERE l.user_id = ?1
                     ORDER BY l.rowid",
                )?
                .query_map([user_id], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLS} FROM users WHERE id = ?1");
    let row = conn.prepare(&sql)?.query_row([id], map_user).optional()?;
    Ok(row)
}

fn user_cols(alias: &str) -> String {
    USER_COLS
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn map_user(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        image_url: row.get(4)?,
        header_image_url: row.get(5)?,
        bio: row.get(6)?,
        location: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn map_message(row: &rusqlite::Row) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        text: row.get(3)?,
        created_at: row.get(4)?,
    })
}
