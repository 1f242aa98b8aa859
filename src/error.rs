use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::response::failure;
use crate::storage::StorageError;

/// Per-field validation messages, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise a 422 error.
    pub fn into_result(self) -> AppResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, list) in errors.field_errors() {
            let field = field.to_string();
            for error in list.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("The {} field is invalid.", field));
                out.add(&field, message);
            }
        }
        out
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthenticated() -> Self {
        AppError::Unauthorized("Unauthenticated.".into())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let internal = |kind: &str, detail: &dyn std::fmt::Display| {
            tracing::error!("{} error: {}", kind, detail);
            failure::<()>(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                None,
            )
        };

        match &self {
            AppError::Validation(errors) => failure(
                StatusCode::UNPROCESSABLE_ENTITY,
                "The given data was invalid.",
                Some(errors),
            ),
            AppError::Unauthorized(msg) => failure::<()>(StatusCode::UNAUTHORIZED, msg, None),
            AppError::NotFound(msg) => failure::<()>(StatusCode::NOT_FOUND, msg, None),
            AppError::BadRequest(msg) => failure::<()>(StatusCode::BAD_REQUEST, msg, None),
            AppError::PayloadTooLarge => failure::<()>(
                StatusCode::PAYLOAD_TOO_LARGE,
                "The request body is too large.",
                None,
            ),
            AppError::Database(e) => internal("Database", e),
            AppError::Pool(e) => internal("Pool", e),
            AppError::Storage(e) => internal("Storage", e),
            AppError::Internal(msg) => internal("Internal", msg),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
