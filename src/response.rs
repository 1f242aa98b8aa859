use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Uniform `{status, message, data}` wrapper used by every API response.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: bool,
    pub message: String,
    pub data: Option<T>,
}

/// A successful API response with its HTTP status.
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    envelope: Envelope<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, Some(data))
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, Some(data))
    }

    fn with_status(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status,
            envelope: Envelope {
                status: true,
                message: message.into(),
                data,
            },
        }
    }
}

impl ApiResponse<()> {
    /// Success with `data: null`.
    pub fn empty(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, message, None)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

/// Error envelope; `data` carries field errors for validation failures.
pub fn failure<T: Serialize>(status: StatusCode, message: &str, data: Option<T>) -> Response {
    (
        status,
        Json(Envelope {
            status: false,
            message: message.to_string(),
            data,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn created_sets_status_and_envelope() {
        let response = ApiResponse::created("Made.", serde_json::json!({"id": "x"})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["status"], true);
        assert_eq!(body["message"], "Made.");
        assert_eq!(body["data"]["id"], "x");
    }

    #[tokio::test]
    async fn empty_serializes_null_data() {
        let response = ApiResponse::empty("Gone.").into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn failure_sets_status_false() {
        let response = failure::<()>(StatusCode::NOT_FOUND, "Post not found.", None);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["status"], false);
        assert_eq!(body["message"], "Post not found.");
    }
}
