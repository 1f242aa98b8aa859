use std::collections::HashMap;

use axum::extract::{FromRequest, FromRequestParts, Multipart, Query, Request};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::Form;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::db::models::User;
use crate::db::{tokens, users};
use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user and the token they used.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

/// Extractor that requires a live bearer token.
/// Returns 401 without touching the store when no token is presented.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(AppError::unauthenticated)?
            .to_string();

        let conn = state.db.get()?;
        let user_id = tokens::resolve(&conn, &token)?.ok_or_else(AppError::unauthenticated)?;
        let user = users::find_by_id(&conn, &user_id)?.ok_or_else(AppError::unauthenticated)?;

        Ok(CurrentUser { user, token })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Query string extractor whose failures use the JSON envelope.
///
/// A repeated key keeps its last value, so `?limit=5&limit=6` reads as
/// `limit=6` instead of failing.
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        parse_query_pairs(pairs).map(QueryParams)
    }
}

fn parse_query_pairs<T: DeserializeOwned>(pairs: Vec<(String, String)>) -> Result<T, AppError> {
    let mut map = serde_json::Map::new();
    for (key, value) in pairs {
        map.insert(key, serde_json::Value::String(value));
    }
    serde_json::from_value(serde_json::Value::Object(map))
        .map_err(|e| AppError::BadRequest(format!("Invalid query string: {}", e)))
}

/// A file part from a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Request body fields, accepted as JSON, urlencoded or multipart.
///
/// Files only arrive through multipart. Non-string JSON scalars are kept in
/// their textual form so validation sees what the client sent.
#[derive(Debug, Default)]
pub struct FormInput {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormInput {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    /// True when the field was sent as plain text where a file was expected.
    pub fn has_text(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|v| !v.is_empty())
    }

    #[cfg(test)]
    pub fn from_fields(pairs: &[(&str, &str)]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: HashMap::new(),
        }
    }

    fn from_json(bytes: &[u8]) -> Result<Self, AppError> {
        let mut input = FormInput::default();
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(input);
        }

        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|_| AppError::BadRequest("Malformed JSON body".into()))?;
        let object = match value {
            serde_json::Value::Object(map) => map,
            _ => return Err(AppError::BadRequest("JSON body must be an object".into())),
        };

        for (key, value) in object {
            let text = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            input.fields.insert(key, text);
        }
        Ok(input)
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut input = FormInput::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    // Browsers send an empty part for an untouched file input
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    input.files.insert(
                        name,
                        UploadedFile {
                            file_name: Some(file_name),
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let text = field.text().await.map_err(multipart_error)?;
                    input.fields.insert(name, text);
                }
            }
        }

        Ok(input)
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(format!("Malformed multipart body: {}", e.body_text()))
    }
}

impl<S: Send + Sync> FromRequest<S> for FormInput {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Self::from_multipart(multipart).await;
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(FormInput {
                fields,
                files: HashMap::new(),
            });
        }

        // JSON, or no declared body at all
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge
            } else {
                AppError::BadRequest(e.body_text())
            }
        })?;
        Self::from_json(&bytes)
    }
}
