use axum::extract::State;
use serde::Serialize;
use validator::Validate;

use crate::auth::password;
use crate::db::models::UserView;
use crate::db::{tokens, users};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::extractors::{CurrentUser, FormInput};
use crate::forms::{LoginForm, SignupForm, PROFILE_PHOTO};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::storage;

const TOKEN_NAME: &str = "auth_token";

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token_type: &'static str,
    pub access_token: String,
    pub user: UserView,
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// -- Handlers --

pub async fn signup(
    State(state): State<AppState>,
    mut input: FormInput,
) -> AppResult<ApiResponse<UserView>> {
    let form = SignupForm::from_input(&mut input);
    let photo = input.take_file(PROFILE_PHOTO.field);

    let mut errors = match form.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => e.into(),
    };

    let photo = match photo {
        Some(file) => match PROFILE_PHOTO.check(&file) {
            Ok(ext) => Some((file, ext)),
            Err(e) => {
                errors.merge(e);
                None
            }
        },
        None => {
            if input.has_text(PROFILE_PHOTO.field) {
                errors.merge(PROFILE_PHOTO.not_a_file());
            }
            None
        }
    };

    let conn = state.db.get()?;
    if let Some(email) = form.email.as_deref() {
        if errors.get("email").is_none() && users::email_taken(&conn, email)? {
            errors.add("email", "The email has already been taken.");
        }
    }
    errors.into_result()?;

    let name = form.name.unwrap_or_default();
    let email = form.email.unwrap_or_default();
    let password = form.password.unwrap_or_default();

    let password_hash = password::hash(&password, state.config.auth.bcrypt_cost)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    let photo_key = match photo {
        Some((file, ext)) => {
            let key = storage::new_key("profile_photos", &ext);
            state.blobs.put(&key, &file.bytes)?;
            Some(key)
        }
        None => None,
    };

    let inserted = users::insert(
        &conn,
        &users::NewUser {
            name: &name,
            email: &email,
            password_hash: &password_hash,
            profile_photo: photo_key.as_deref(),
        },
    );

    let user = match inserted {
        Ok(user) => user,
        Err(e) => {
            if let Some(key) = photo_key.as_deref() {
                storage::discard(state.blobs.as_ref(), key);
            }
            // Lost a race with a concurrent signup for the same address
            if is_unique_violation(&e) {
                return Err(AppError::Validation(FieldErrors::single(
                    "email",
                    "The email has already been taken.",
                )));
            }
            return Err(e.into());
        }
    };

    tracing::info!("Registered user {} ({})", user.id, user.email);
    Ok(ApiResponse::created(
        "User registered successfully.",
        user.view(state.blobs.as_ref()),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    mut input: FormInput,
) -> AppResult<ApiResponse<LoginResponse>> {
    let form = LoginForm::from_input(&mut input);
    form.validate()?;

    let email = form.email.unwrap_or_default();
    let password = form.password.unwrap_or_default();

    let conn = state.db.get()?;
    let user = users::find_by_email(&conn, &email)?
        .filter(|u| password::verify(&password, &u.password_hash))
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password.".into()))?;

    let access_token = tokens::issue(&conn, &user.id, TOKEN_NAME, state.config.auth.token_hours)?;
    tracing::debug!("Issued token for user {}", user.id);

    Ok(ApiResponse::ok(
        "User logged in successfully.",
        LoginResponse {
            token_type: "Bearer",
            access_token,
            user: user.view(state.blobs.as_ref()),
        },
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<ApiResponse<()>> {
    let conn = state.db.get()?;
    tokens::revoke(&conn, &current.token)?;
    Ok(ApiResponse::empty("User logged out successfully."))
}

pub async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<ApiResponse<UserView>> {
    Ok(ApiResponse::ok(
        "User retrieved successfully.",
        current.user.view(state.blobs.as_ref()),
    ))
}
