use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::users::UserError;
use thiserror::Error;
use tracing::{debug, error};

/// Handler-side wrapper for user operation failures.
///
/// Every failure is answered with `200 OK` and an `{"error": ...}` body;
/// clients tell success from failure by the body alone.
#[derive(Debug)]
pub struct ApiError(pub UserError);

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self { Self(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        match &err {
            UserError::Storage(cause) => error!(code = err.code(), error = %cause, "storage failure"),
            other => debug!(code = other.code(), error = %other, "request rejected"),
        }
        (StatusCode::OK, Json(serde_json::json!({"error": err.to_string()}))).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("storage unavailable: {0}")]
    Storage(#[from] service::errors::StoreError),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: UserError) -> serde_json::Value {
        let res = ApiError(err).into_response();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn errors_render_as_ok_with_error_body() {
        assert_eq!(body_of(UserError::NotFound).await, serde_json::json!({"error": "Username not found."}));
        assert_eq!(body_of(UserError::OperationFailed).await, serde_json::json!({"error": "Something went wrong."}));
    }
}
