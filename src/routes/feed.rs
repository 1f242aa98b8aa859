use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, QueryParams};
use crate::feed::{self, FeedPost, FeedQuery, FeedRequest, FeedScope, Page};
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/feed", get(global_feed))
}

/// Every user's posts, newest first, with the viewer's reaction state.
async fn global_feed(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(query): QueryParams<FeedQuery>,
) -> AppResult<ApiResponse<Page<FeedPost>>> {
    let request = FeedRequest::from_query(FeedScope::Global, query, &state.config.feed)
        .map_err(AppError::Validation)?;

    let conn = state.db.get()?;
    let page = feed::fetch(
        &conn,
        state.blobs.as_ref(),
        user.id(),
        &request,
        state.config.feed.case_sensitive_search,
    )?;

    Ok(ApiResponse::ok("Feed retrieved successfully.", page))
}
