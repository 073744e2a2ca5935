//! API error taxonomy. Request validation and total engine
//! unavailability are the only hard failures; every stage-level problem
//! is absorbed by its stage and never surfaces here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Caller error, rejected before any engine is invoked.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The capability probe found the engine missing.
    #[error("Scan engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A stage exceeded its hard deadline.
    #[error("Scan timeout: {0}")]
    ScanTimeout(String),

    /// Non-zero exit or malformed output from an external engine.
    #[error("Scan engine error: {0}")]
    EngineError(String),

    /// The concurrent-run bound is exhausted.
    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn engine_unavailable(msg: impl Into<String>) -> Self {
        Self::EngineUnavailable(msg.into())
    }

    pub fn scan_timeout(msg: impl Into<String>) -> Self {
        Self::ScanTimeout(msg.into())
    }

    pub fn engine_error(msg: impl Into<String>) -> Self {
        Self::EngineError(msg.into())
    }

    pub fn capacity(msg: impl Into<String>) -> Self {
        Self::Capacity(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ScanTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::EngineError(_) => StatusCode::BAD_GATEWAY,
            Self::Capacity(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::EngineUnavailable(_) => "ENGINE_UNAVAILABLE",
            Self::ScanTimeout(_) => "SCAN_TIMEOUT",
            Self::EngineError(_) => "ENGINE_ERROR",
            Self::Capacity(_) => "CAPACITY_EXCEEDED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let status = self.status();

        // Caller-side problems (4xx) are expected traffic; engine-side
        // failures are not.
        if status.is_client_error() {
            tracing::warn!(error_id = %error_id, code = self.code(), error = %self, "request rejected");
        } else {
            tracing::error!(error_id = %error_id, code = self.code(), error = %self, "request failed");
        }

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "code": self.code(),
                "error_id": error_id,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    async fn respond_with(make: fn() -> ApiError) -> StatusCode {
        let app = Router::new().route(
            "/probe",
            get(move || async move { Err::<&'static str, ApiError>(make()) }),
        );
        let request = Request::builder()
            .uri("/probe")
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_status_mapping() {
        assert_eq!(
            respond_with(|| ApiError::validation("Target is required")).await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            respond_with(|| ApiError::engine_unavailable("nmap is not installed")).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            respond_with(|| ApiError::scan_timeout("discovery scan timed out")).await,
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            respond_with(|| ApiError::engine_error("exit status 1")).await,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            respond_with(|| ApiError::capacity("too many scans")).await,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            respond_with(|| ApiError::internal("broken")).await,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::validation("x").code(), "VALIDATION_ERROR");
        assert_eq!(ApiError::scan_timeout("x").code(), "SCAN_TIMEOUT");
        assert_eq!(ApiError::capacity("x").code(), "CAPACITY_EXCEEDED");
    }

    #[test]
    fn test_display_carries_message() {
        let err = ApiError::engine_error("discovery engine exited with 1");
        assert!(err.to_string().contains("exited with 1"));
    }
}
