pub mod aggregate;
mod query;

use serde::{Deserialize, Serialize};

use crate::config::FeedConfig;
use crate::db::models::PostView;
use crate::error::FieldErrors;

pub use self::aggregate::ReactionSummary;
pub use self::query::fetch;

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    /// Only posts owned by the viewer.
    Own,
    /// Every post.
    Global,
}

/// Raw query string of `/posts` and `/feed`.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub search: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
}

/// A validated listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub scope: FeedScope,
    pub search: Option<String>,
    pub per_page: u64,
    pub page: u64,
}

impl FeedRequest {
    /// Apply defaults and validate. Only `limit` can fail; a bad `page` falls back to 1.
    pub fn from_query(
        scope: FeedScope,
        query: FeedQuery,
        config: &FeedConfig,
    ) -> Result<Self, FieldErrors> {
        let per_page = match query.limit.as_deref().map(str::trim) {
            None | Some("") => u64::from(config.default_page_size.max(1)),
            Some(raw) => match raw.parse::<u64>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(FieldErrors::single(
                        "limit",
                        "The limit field must be an integer of at least 1.",
                    ))
                }
            },
        };
        let per_page = match config.max_page_size {
            Some(cap) => per_page.min(u64::from(cap.max(1))),
            None => per_page,
        };

        let page = query
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<u64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);

        let search = query.search.filter(|s| !s.is_empty());

        Ok(Self {
            scope,
            search,
            per_page,
            page,
        })
    }

    /// Row offset of the first item on this page, clamped to what SQLite accepts.
    pub fn offset(&self) -> i64 {
        let offset = (self.page - 1).saturating_mul(self.per_page);
        i64::try_from(offset).unwrap_or(i64::MAX)
    }

    pub fn limit(&self) -> i64 {
        i64::try_from(self.per_page).unwrap_or(i64::MAX)
    }
}

/// Owner summary attached to each feed item.
#[derive(Debug, Clone, Serialize)]
pub struct PostOwner {
    pub id: String,
    pub name: String,
    pub profile_photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedPost {
    #[serde(flatten)]
    pub post: PostView,
    #[serde(flatten)]
    pub reactions: ReactionSummary,
    pub comment_count: i64,
    pub user: PostOwner,
}

/// One page of results plus what a client needs to draw pagination controls.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub current_page: u64,
    pub data: Vec<T>,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(request: &FeedRequest, data: Vec<T>, total: u64) -> Self {
        let last_page = total.div_ceil(request.per_page).max(1);
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            let start = request.offset() as u64;
            (Some(start + 1), Some(start + data.len() as u64))
        };
        Self {
            current_page: request.page,
            data,
            per_page: request.per_page,
            total,
            last_page,
            from,
            to,
        }
    }
}
