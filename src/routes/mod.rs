pub mod auth;
pub mod feed;
pub mod posts;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::forms::PROFILE_PHOTO;
use crate::response::failure;
use crate::state::AppState;

/// Room for multipart framing and text fields on top of the largest file.
const BODY_SLACK: usize = 1024 * 1024;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let largest_upload = state
        .config
        .max_upload_bytes()
        .max((PROFILE_PHOTO.max_kb as usize) * 1024);
    let blobs = ServeDir::new(state.config.storage_path());

    Router::new()
        .merge(auth::router())
        .merge(posts::router())
        .merge(feed::router())
        .nest_service("/storage", blobs)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(DefaultBodyLimit::max(largest_upload + BODY_SLACK))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found() -> Response {
    failure::<()>(StatusCode::NOT_FOUND, "Not found.", None)
}

async fn method_not_allowed() -> Response {
    failure::<()>(
        StatusCode::METHOD_NOT_ALLOWED,
        "The method is not supported for this route.",
        None,
    )
}
