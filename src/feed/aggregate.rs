//! Per-post reaction aggregates.
//!
//! Read-only. The feed query splices [`joins`] and [`COLUMNS`] into its own
//! statement so counts come back in the same round trip; single-post reads
//! use [`summary_for_post`].

use rusqlite::{params, Connection};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReactionSummary {
    pub like_count: i64,
    pub dislike_count: i64,
    /// 1 when the viewer holds a positive reaction on the post, else 0.
    pub is_liked: i64,
}

/// Select-list entries produced by [`joins`], in `ReactionSummary` field order.
pub const COLUMNS: &str =
    "COALESCE(rc.like_count, 0), COALESCE(rc.dislike_count, 0), COALESCE(mine.is_like, 0)";

/// LEFT JOINs attaching reaction counts and the viewer's own reaction to rows
/// aliased `alias`.
///
/// Counts are grouped only over post ids produced by `ids`, a subquery
/// yielding one `id` column. The viewer join hits `UNIQUE(post_id, user_id)`,
/// so it adds at most one row per post.
pub fn joins(alias: &str, ids: &str, viewer_param: usize) -> String {
    format!(
        "LEFT JOIN (
            SELECT post_id,
                   SUM(CASE WHEN is_like = 1 THEN 1 ELSE 0 END) AS like_count,
                   SUM(CASE WHEN is_like = 0 THEN 1 ELSE 0 END) AS dislike_count
            FROM reactions
            WHERE post_id IN ({ids})
            GROUP BY post_id
         ) rc ON rc.post_id = {alias}.id
         LEFT JOIN reactions mine
            ON mine.post_id = {alias}.id AND mine.user_id = ?{viewer_param}"
    )
}

/// Read a [`ReactionSummary`] from three consecutive columns starting at `idx`.
pub fn read(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<ReactionSummary> {
    Ok(ReactionSummary {
        like_count: row.get(idx)?,
        dislike_count: row.get(idx + 1)?,
        is_liked: row.get(idx + 2)?,
    })
}

pub fn summary_for_post(
    conn: &Connection,
    post_id: &str,
    viewer_id: &str,
) -> rusqlite::Result<ReactionSummary> {
    conn.query_row(
        "SELECT COALESCE(SUM(CASE WHEN is_like = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_like = 0 THEN 1 ELSE 0 END), 0),
                COALESCE(MAX(CASE WHEN user_id = ?2 AND is_like = 1 THEN 1 ELSE 0 END), 0)
         FROM reactions
         WHERE post_id = ?1",
        params![post_id, viewer_id],
        |row| read(row, 0),
    )
}
