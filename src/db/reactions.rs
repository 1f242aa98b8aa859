use std::fmt;
use std::str::FromStr;

use rusqlite::{params, Connection};

use crate::db::models::Reaction;
use crate::db::NOW;

/// The two reaction values a user can hold on a post.
///
/// There is no "none" once a row exists; switching sides overwrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn is_like(self) -> bool {
        self == ReactionKind::Like
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "like" => Ok(ReactionKind::Like),
            "dislike" => Ok(ReactionKind::Dislike),
            _ => Err(()),
        }
    }
}

/// Set the user's reaction on a post, replacing any earlier one.
///
/// Single statement keyed on `UNIQUE(post_id, user_id)`, so racing requests
/// from the same user resolve to whichever write lands last.
pub fn upsert(
    conn: &Connection,
    post_id: &str,
    user_id: &str,
    kind: ReactionKind,
) -> rusqlite::Result<Reaction> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.query_row(
        &format!(
            "INSERT INTO reactions (id, post_id, user_id, is_like)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(post_id, user_id) DO UPDATE SET
               is_like = excluded.is_like,
               updated_at = {NOW}
             RETURNING id, post_id, user_id, is_like, created_at, updated_at"
        ),
        params![id, post_id, user_id, kind.is_like()],
        |row| {
            Ok(Reaction {
                id: row.get(0)?,
                post_id: row.get(1)?,
                user_id: row.get(2)?,
                is_like: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        },
    )
}
