use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::db::models::Comment;
use crate::db::{posts, substring_match, substring_param};
use crate::storage::BlobStore;

#[derive(Debug, Clone, Serialize)]
pub struct CommentAuthor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub profile_photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: CommentAuthor,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<CommentWithAuthor> {
    let user_id: String = row.get(2)?;
    Ok(CommentWithAuthor {
        comment: Comment {
            id: row.get(0)?,
            post_id: row.get(1)?,
            user_id: user_id.clone(),
            comment_text: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        },
        user: CommentAuthor {
            id: user_id,
            name: row.get(6)?,
            email: row.get(7)?,
            profile_photo_url: row.get(8)?,
        },
    })
}

pub fn insert(
    conn: &Connection,
    post_id: &str,
    user_id: &str,
    text: &str,
) -> rusqlite::Result<Comment> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.query_row(
        "INSERT INTO comments (id, post_id, user_id, comment_text)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id, post_id, user_id, comment_text, created_at, updated_at",
        params![id, post_id, user_id, text],
        |row| {
            Ok(Comment {
                id: row.get(0)?,
                post_id: row.get(1)?,
                user_id: row.get(2)?,
                comment_text: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        },
    )
}

pub fn count_for_post(conn: &Connection, post_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
        params![post_id],
        |row| row.get(0),
    )
}

/// Comments on a post, newest first, with author details.
///
/// Returns `None` when the post does not exist.
pub fn list_for_post(
    conn: &Connection,
    blobs: &dyn BlobStore,
    post_id: &str,
    search: Option<&str>,
    case_sensitive: bool,
) -> rusqlite::Result<Option<Vec<CommentWithAuthor>>> {
    if !posts::exists(conn, post_id)? {
        return Ok(None);
    }

    let mut sql = String::from(
        "SELECT c.id, c.post_id, c.user_id, c.comment_text, c.created_at, c.updated_at,
                u.name, u.email, u.profile_photo
         FROM comments c
         JOIN users u ON u.id = c.user_id
         WHERE c.post_id = ?1",
    );
    if search.is_some() {
        sql.push_str(" AND ");
        sql.push_str(&substring_match("c.comment_text", 2, case_sensitive));
    }
    sql.push_str(" ORDER BY c.created_at DESC, c.id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let mut comments = match search {
        Some(term) => stmt
            .query_map(
                params![post_id, substring_param(term, case_sensitive)],
                from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt
            .query_map(params![post_id], from_row)?
            .collect::<Result<Vec<_>, _>>()?,
    };

    // from_row leaves the raw blob key in place of the URL
    for c in &mut comments {
        c.user.profile_photo_url = c.user.profile_photo_url.take().map(|k| blobs.url(&k));
    }

    Ok(Some(comments))
}
