use rusqlite::{params, Connection, Row};

use crate::db::models::PostView;
use crate::db::{substring_match, substring_param};
use crate::storage::BlobStore;

use super::aggregate;
use super::{FeedPost, FeedRequest, FeedScope, Page, PostOwner};

// Bind slots shared by the count and page statements.
const VIEWER: usize = 1;
const SEARCH: usize = 2;
const LIMIT: usize = 3;
const OFFSET: usize = 4;

fn where_clause(request: &FeedRequest, case_sensitive: bool) -> String {
    let mut clauses = vec![format!(
        "(?{SEARCH} IS NULL OR {})",
        substring_match("p.content", SEARCH, case_sensitive)
    )];
    if request.scope == FeedScope::Own {
        clauses.push(format!("p.user_id = ?{VIEWER}"));
    }
    clauses.join(" AND ")
}

fn page_sql(request: &FeedRequest, case_sensitive: bool) -> String {
    format!(
        "WITH page AS (
            SELECT p.id, p.user_id, p.content, p.media_path, p.created_at, p.updated_at
            FROM posts p
            WHERE {filter}
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ?{LIMIT} OFFSET ?{OFFSET}
         )
         SELECT p.id, p.user_id, p.content, p.media_path, p.created_at, p.updated_at,
                u.name, u.profile_photo,
                {reaction_columns},
                COALESCE(cc.comment_count, 0)
         FROM page p
         JOIN users u ON u.id = p.user_id
         {reaction_joins}
         LEFT JOIN (
            SELECT post_id, COUNT(*) AS comment_count
            FROM comments
            WHERE post_id IN (SELECT id FROM page)
            GROUP BY post_id
         ) cc ON cc.post_id = p.id
         ORDER BY p.created_at DESC, p.id DESC",
        filter = where_clause(request, case_sensitive),
        reaction_columns = aggregate::COLUMNS,
        reaction_joins = aggregate::joins("p", "SELECT id FROM page", VIEWER),
    )
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<FeedPost> {
    let user_id: String = row.get(1)?;
    Ok(FeedPost {
        post: PostView {
            id: row.get(0)?,
            user_id: user_id.clone(),
            content: row.get(2)?,
            media_url: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        },
        user: PostOwner {
            id: user_id,
            name: row.get(6)?,
            profile_photo_url: row.get(7)?,
        },
        reactions: aggregate::read(row, 8)?,
        comment_count: row.get(11)?,
    })
}

/// Run a feed listing for `viewer_id`.
///
/// One statement counts matching posts, one fetches the page with owner,
/// reaction and comment aggregates joined in. Pages past the end are empty.
pub fn fetch(
    conn: &Connection,
    blobs: &dyn BlobStore,
    viewer_id: &str,
    request: &FeedRequest,
    case_sensitive: bool,
) -> rusqlite::Result<Page<FeedPost>> {
    let search = request
        .search
        .as_deref()
        .map(|term| substring_param(term, case_sensitive));

    let total: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM posts p WHERE {}",
            where_clause(request, case_sensitive)
        ),
        params![viewer_id, search],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&page_sql(request, case_sensitive))?;
    let mut posts = stmt
        .query_map(
            params![viewer_id, search, request.limit(), request.offset()],
            from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    // from_row leaves raw blob keys where URLs belong
    for item in &mut posts {
        item.post.media_url = item.post.media_url.take().map(|k| blobs.url(&k));
        item.user.profile_photo_url = item.user.profile_photo_url.take().map(|k| blobs.url(&k));
    }

    Ok(Page::new(request, posts, total.max(0) as u64))
}
