use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::comments::{self, CommentWithAuthor};
use crate::db::models::{Comment, PostView, Reaction};
use crate::db::posts;
use crate::db::reactions::{self, ReactionKind};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::extractors::{CurrentUser, FormInput, QueryParams};
use crate::feed::{
    self, aggregate, FeedPost, FeedQuery, FeedRequest, FeedScope, Page, ReactionSummary,
};
use crate::forms::{self, CommentForm, PostForm};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::storage;

// --- Types ---

#[derive(Debug, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostView,
    #[serde(flatten)]
    pub reactions: ReactionSummary,
    pub comment_count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentQuery {
    pub search: Option<String>,
}

fn post_not_found() -> AppError {
    AppError::NotFound("Post not found.".into())
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(show_post).delete(delete_post))
        .route("/posts/{id}/comments", get(list_comments))
        .route("/posts/{id}/comment", post(create_comment))
        .route("/posts/{id}/like", post(like_post))
        .route("/posts/{id}/dislike", post(dislike_post))
}

// --- Handlers ---

async fn list_posts(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(query): QueryParams<FeedQuery>,
) -> AppResult<ApiResponse<Page<FeedPost>>> {
    let request = FeedRequest::from_query(FeedScope::Own, query, &state.config.feed)
        .map_err(AppError::Validation)?;

    let conn = state.db.get()?;
    let page = feed::fetch(
        &conn,
        state.blobs.as_ref(),
        user.id(),
        &request,
        state.config.feed.case_sensitive_search,
    )?;

    Ok(ApiResponse::ok("Posts retrieved successfully.", page))
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    mut input: FormInput,
) -> AppResult<ApiResponse<PostView>> {
    let form = PostForm::from_input(&mut input);
    let rule = forms::post_media(state.config.storage.max_upload_kb);
    let media = input.take_file(rule.field);

    let mut errors = match form.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => e.into(),
    };
    let media = match media {
        Some(file) => match rule.check(&file) {
            Ok(ext) => Some((file, ext)),
            Err(e) => {
                errors.merge(e);
                None
            }
        },
        None => {
            if input.has_text(rule.field) {
                errors.merge(rule.not_a_file());
            }
            None
        }
    };
    errors.into_result()?;

    let content = form.content.unwrap_or_default();

    let media_key = match media {
        Some((file, ext)) => {
            let key = storage::new_key("media", &ext);
            state.blobs.put(&key, &file.bytes)?;
            Some(key)
        }
        None => None,
    };

    let conn = state.db.get()?;
    let inserted = posts::insert(
        &conn,
        &posts::NewPost {
            user_id: user.id(),
            content: &content,
            media_path: media_key.as_deref(),
        },
    );

    let post = match inserted {
        Ok(post) => post,
        Err(e) => {
            if let Some(key) = media_key.as_deref() {
                storage::discard(state.blobs.as_ref(), key);
            }
            return Err(e.into());
        }
    };

    tracing::info!("User {} created post {}", user.id(), post.id);
    Ok(ApiResponse::created(
        "Post created successfully.",
        post.view(state.blobs.as_ref()),
    ))
}

async fn show_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PostDetail>> {
    let conn = state.db.get()?;
    let post = posts::find_owned(&conn, &id, user.id())?.ok_or_else(post_not_found)?;
    let reactions = aggregate::summary_for_post(&conn, &post.id, user.id())?;
    let comment_count = comments::count_for_post(&conn, &post.id)?;

    Ok(ApiResponse::ok(
        "Post retrieved successfully.",
        PostDetail {
            post: post.view(state.blobs.as_ref()),
            reactions,
            comment_count,
        },
    ))
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    let post = posts::find_owned(&tx, &id, user.id())?.ok_or_else(post_not_found)?;
    posts::delete_owned(&tx, &post.id, user.id())?;

    // The row only goes away once its media is gone; a failed removal rolls back.
    if let Some(key) = post.media_path.as_deref() {
        state.blobs.delete(key)?;
    }
    if let Err(e) = tx.commit() {
        if let Some(key) = post.media_path.as_deref() {
            tracing::warn!(
                "Post {} kept after its media {} was removed: {}",
                post.id,
                key,
                e
            );
        }
        return Err(e.into());
    }

    tracing::info!("User {} deleted post {}", user.id(), post.id);
    Ok(ApiResponse::empty("Post deleted successfully."))
}

async fn list_comments(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(post_id): Path<String>,
    QueryParams(query): QueryParams<CommentQuery>,
) -> AppResult<ApiResponse<Vec<CommentWithAuthor>>> {
    let search = query.search.filter(|s| !s.is_empty());

    let conn = state.db.get()?;
    let comments = comments::list_for_post(
        &conn,
        state.blobs.as_ref(),
        &post_id,
        search.as_deref(),
        state.config.feed.case_sensitive_search,
    )?
    .ok_or_else(post_not_found)?;

    Ok(ApiResponse::ok("Comments retrieved successfully.", comments))
}

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    mut input: FormInput,
) -> AppResult<ApiResponse<Comment>> {
    let form = CommentForm::from_input(&mut input);
    form.validate()?;
    let text = form.comment_text.unwrap_or_default();

    let conn = state.db.get()?;
    if !posts::exists(&conn, &post_id)? {
        return Err(post_not_found());
    }
    let comment = comments::insert(&conn, &post_id, user.id(), &text)?;

    Ok(ApiResponse::created("Comment added successfully.", comment))
}

async fn like_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    input: FormInput,
) -> AppResult<ApiResponse<Reaction>> {
    react(&state, &user, &post_id, &input, ReactionKind::Like)
}

async fn dislike_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    input: FormInput,
) -> AppResult<ApiResponse<Reaction>> {
    react(&state, &user, &post_id, &input, ReactionKind::Dislike)
}

/// `reaction_type` in the body is optional, but when sent it must name the
/// same reaction as the route.
fn check_reaction_type(input: &FormInput, kind: ReactionKind) -> Result<(), FieldErrors> {
    let Some(raw) = input.text("reaction_type") else {
        return Ok(());
    };
    match raw.parse::<ReactionKind>() {
        Ok(sent) if sent == kind => Ok(()),
        Ok(_) => Err(FieldErrors::single(
            "reaction_type",
            format!("The reaction type must be {}.", kind),
        )),
        Err(()) => Err(FieldErrors::single(
            "reaction_type",
            "The selected reaction type is invalid.",
        )),
    }
}

fn react(
    state: &AppState,
    user: &CurrentUser,
    post_id: &str,
    input: &FormInput,
    kind: ReactionKind,
) -> AppResult<ApiResponse<Reaction>> {
    check_reaction_type(input, kind).map_err(AppError::Validation)?;

    let conn = state.db.get()?;
    if !posts::exists(&conn, post_id)? {
        return Err(post_not_found());
    }
    let reaction = reactions::upsert(&conn, post_id, user.id(), kind)?;
    tracing::debug!("User {} reacted {} on post {}", user.id(), kind, post_id);

    Ok(ApiResponse::created("Reaction added successfully.", reaction))
}
