use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::NOW;

/// Issue a new bearer token for a user. `hours == 0` issues a token that never expires.
pub fn issue(conn: &Connection, user_id: &str, name: &str, hours: u64) -> rusqlite::Result<String> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();
    let expires = (hours > 0).then(|| format!("+{} hours", hours));

    conn.execute(
        "INSERT INTO access_tokens (id, user_id, token, name, expires_at)
         VALUES (?1, ?2, ?3, ?4,
                 CASE WHEN ?5 IS NULL THEN NULL
                      ELSE strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?5) END)",
        params![id, user_id, token, name, expires],
    )?;

    Ok(token)
}

/// Resolve a live token to its user id and mark it used.
pub fn resolve(conn: &Connection, token: &str) -> rusqlite::Result<Option<String>> {
    let user_id: Option<String> = conn
        .query_row(
            &format!(
                "SELECT user_id FROM access_tokens
                 WHERE token = ?1 AND (expires_at IS NULL OR expires_at > {NOW})"
            ),
            params![token],
            |row| row.get(0),
        )
        .optional()?;

    if user_id.is_some() {
        conn.execute(
            &format!("UPDATE access_tokens SET last_used_at = {NOW} WHERE token = ?1"),
            params![token],
        )?;
    }

    Ok(user_id)
}

/// Delete a token. Returns whether a row was removed.
pub fn revoke(conn: &Connection, token: &str) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM access_tokens WHERE token = ?1", params![token])?;
    Ok(rows > 0)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_user, test_pool};

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn issued_token_resolves_to_user() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user = seed_user(&conn, "a@x.com");

        let token = issue(&conn, &user.id, "auth_token", 1).unwrap();
        assert_eq!(resolve(&conn, &token).unwrap(), Some(user.id.clone()));

        let used: Option<String> = conn
            .query_row(
                "SELECT last_used_at FROM access_tokens WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .unwrap();
        assert!(used.is_some());
    }

    #[test]
    fn zero_hours_never_expires() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user = seed_user(&conn, "a@x.com");
        let token = issue(&conn, &user.id, "auth_token", 0).unwrap();

        let expires: Option<String> = conn
            .query_row(
                "SELECT expires_at FROM access_tokens WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .unwrap();
        assert!(expires.is_none());
        assert!(resolve(&conn, &token).unwrap().is_some());
    }

    #[test]
    fn expired_token_does_not_resolve() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user = seed_user(&conn, "a@x.com");
        let token = issue(&conn, &user.id, "auth_token", 1).unwrap();
        conn.execute(
            "UPDATE access_tokens SET expires_at = '2000-01-01T00:00:00.000Z' WHERE token = ?1",
            params![token],
        )
        .unwrap();
        assert!(resolve(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn revoked_token_does_not_resolve() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user = seed_user(&conn, "a@x.com");
        let token = issue(&conn, &user.id, "auth_token", 1).unwrap();

        assert!(revoke(&conn, &token).unwrap());
        assert!(!revoke(&conn, &token).unwrap());
        assert!(resolve(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn unknown_token_does_not_resolve() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        assert!(resolve(&conn, "deadbeef").unwrap().is_none());
    }
}
