//! Maps domain and request errors onto the `{"detail": {"code", "message"}}`
//! envelope every endpoint returns on failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use modelforge_utils::error::{ModelForgeError, UserFriendlyError};
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { status, code: code.into(), message: message.into() }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    #[must_use]
    pub fn project_not_found(id: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, "PROJECT_NOT_FOUND", format!("project {id} not found"))
    }

    #[must_use]
    pub fn document_not_found(id: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, "DOCUMENT_NOT_FOUND", format!("document {id} not found"))
    }

    #[must_use]
    pub fn job_not_found(id: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, "JOB_NOT_FOUND", format!("job {id} not found"))
    }

    #[must_use]
    pub fn file_not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "FILE_NOT_FOUND", message)
    }

    #[must_use]
    pub fn file_too_large(max_bytes: u64) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE", format!("upload exceeds the {max_bytes} byte limit"))
    }

    #[must_use]
    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "NOT_READY", message)
    }

    #[must_use]
    pub fn phase3_not_completed() -> Self {
        Self::new(StatusCode::CONFLICT, "PHASE3_NOT_COMPLETED", "phase 3 must complete before phase 4 can run")
    }

    #[must_use]
    pub fn phase3_empty_result() -> Self {
        Self::new(
            StatusCode::CONFLICT,
            "PHASE3_EMPTY_RESULT",
            "phase 3 produced no sheet or segment mapping; retry with allow_estimation to proceed in estimation mode",
        )
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "detail": { "code": self.code, "message": self.message } }));
        (self.status, body).into_response()
    }
}

impl From<ModelForgeError> for ApiError {
    fn from(e: ModelForgeError) -> Self {
        let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = e.code().to_uppercase();
        Self { status, code, message: e.user_message() }
    }
}
