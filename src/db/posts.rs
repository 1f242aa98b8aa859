use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::Post;

const COLUMNS: &str = "id, user_id, content, media_path, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        media_path: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub struct NewPost<'a> {
    pub user_id: &'a str,
    pub content: &'a str,
    pub media_path: Option<&'a str>,
}

pub fn insert(conn: &Connection, post: &NewPost<'_>) -> rusqlite::Result<Post> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.query_row(
        &format!(
            "INSERT INTO posts (id, user_id, content, media_path)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING {COLUMNS}"
        ),
        params![id, post.user_id, post.content, post.media_path],
        from_row,
    )
}

/// Fetch a post only if `owner_id` owns it.
pub fn find_owned(conn: &Connection, id: &str, owner_id: &str) -> rusqlite::Result<Option<Post>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM posts WHERE id = ?1 AND user_id = ?2"),
        params![id, owner_id],
        from_row,
    )
    .optional()
}

pub fn exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}

/// Delete a post owned by `owner_id`. Comments and reactions go with it.
pub fn delete_owned(conn: &Connection, id: &str, owner_id: &str) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "DELETE FROM posts WHERE id = ?1 AND user_id = ?2",
        params![id, owner_id],
    )?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_post, seed_user, test_pool};

    #[test]
    fn insert_returns_stored_row() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user = seed_user(&conn, "a@x.com");
        let post = insert(
            &conn,
            &NewPost {
                user_id: &user.id,
                content: "hello",
                media_path: Some("media/x.png"),
            },
        )
        .unwrap();
        assert_eq!(post.user_id, user.id);
        assert_eq!(post.content, "hello");
        assert_eq!(post.media_path.as_deref(), Some("media/x.png"));
        assert!(exists(&conn, &post.id).unwrap());
    }

    #[test]
    fn find_owned_hides_other_users_posts() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = seed_user(&conn, "a@x.com");
        let bob = seed_user(&conn, "b@x.com");
        let post = seed_post(&conn, &alice.id, "mine");

        assert!(find_owned(&conn, &post.id, &alice.id).unwrap().is_some());
        assert!(find_owned(&conn, &post.id, &bob.id).unwrap().is_none());
    }

    #[test]
    fn delete_owned_cascades_to_comments_and_reactions() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = seed_user(&conn, "a@x.com");
        let bob = seed_user(&conn, "b@x.com");
        let post = seed_post(&conn, &alice.id, "bye");
        conn.execute(
            "INSERT INTO comments (id, post_id, user_id, comment_text) VALUES ('c1', ?1, ?2, 'x')",
            params![post.id, bob.id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO reactions (id, post_id, user_id, is_like) VALUES ('r1', ?1, ?2, 1)",
            params![post.id, bob.id],
        )
        .unwrap();

        assert!(!delete_owned(&conn, &post.id, &bob.id).unwrap());
        assert!(delete_owned(&conn, &post.id, &alice.id).unwrap());
        assert!(!exists(&conn, &post.id).unwrap());

        let leftovers: i64 = conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM comments) + (SELECT COUNT(*) FROM reactions)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(leftovers, 0);
    }
}
