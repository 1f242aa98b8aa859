use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::User;

const COLUMNS: &str = "id, name, email, password_hash, profile_photo, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        profile_photo: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub profile_photo: Option<&'a str>,
}

pub fn insert(conn: &Connection, user: &NewUser<'_>) -> rusqlite::Result<User> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.query_row(
        &format!(
            "INSERT INTO users (id, name, email, password_hash, profile_photo)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {COLUMNS}"
        ),
        params![
            id,
            user.name,
            user.email,
            user.password_hash,
            user.profile_photo
        ],
        from_row,
    )
}

pub fn find_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

pub fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE email = ?1"),
        params![email],
        from_row,
    )
    .optional()
}

pub fn email_taken(conn: &Connection, email: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )
}
