pub mod comments;
pub mod models;
pub mod posts;
pub mod reactions;
pub mod tokens;
pub mod users;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::state::DbPool;

pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_initial",
        include_str!("../../migrations/001_initial.sql"),
    ),
    (
        "002_access_tokens",
        include_str!("../../migrations/002_access_tokens.sql"),
    ),
];

/// Current time in the format every timestamp column uses.
pub const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

fn configure(conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
    // Per-connection settings; every pooled connection needs them.
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )
}

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(db_path).with_init(configure);
    let pool = Pool::builder().max_size(8).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;

    // Create migrations tracking table
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

/// Escape `%`, `_` and `\` so a search term matches literally inside `LIKE ... ESCAPE '\'`.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// SQL predicate for a literal substring match of `?{param}` within `column`.
pub fn substring_match(column: &str, param: usize, case_sensitive: bool) -> String {
    if case_sensitive {
        format!("instr({}, ?{}) > 0", column, param)
    } else {
        format!("{} LIKE '%' || ?{} || '%' ESCAPE '\\'", column, param)
    }
}

/// Bind value matching [`substring_match`] for the same `case_sensitive` flag.
pub fn substring_param(term: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        term.to_string()
    } else {
        escape_like(term)
    }
}

#[cfg(test)]
pub fn test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory().with_init(configure);
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    run_migrations(&pool).unwrap();
    pool
}

#[cfg(test)]
pub fn seed_user(conn: &rusqlite::Connection, email: &str) -> models::User {
    let name = email.split('@').next().unwrap_or(email);
    users::insert(
        conn,
        &users::NewUser {
            name,
            email,
            password_hash: "not-a-real-hash",
            profile_photo: None,
        },
    )
    .unwrap()
}

#[cfg(test)]
pub fn seed_post(conn: &rusqlite::Connection, user_id: &str, content: &str) -> models::Post {
    posts::insert(
        conn,
        &posts::NewPost {
            user_id,
            content,
            media_path: None,
        },
    )
    .unwrap()
}
