//! Error taxonomy and the HTTP/exit-code mapping table.
//!
//! Every error a caller can observe is one variant of [`ModelForgeError`].
//! The mapping below is the single source of truth for both the CLI exit
//! code and the HTTP status returned by `modelforge-server`:
//!
//! | Variant               | HTTP | Meaning                                    |
//! |------------------------|------|---------------------------------------------|
//! | `Validation`           | 422  | caller input failed a precondition           |
//! | `NotFound`             | 404  | referenced entity does not exist             |
//! | `Conflict`             | 409  | phase gating / duplicate dispatch violation  |
//! | `Unauthorized`         | 401  | admin auth missing or invalid                |
//! | `Provider`             | 502  | upstream LLM provider failure                |
//! | `JsonGuard`            | 502  | LLM output failed the JSON guard pipeline    |
//! | `EmptyCriticalResult`  | 502  | guard accepted output but it was vacuous     |
//! | `Timeout`              | 504  | a phase job exceeded its hard timeout        |
//! | `Store`                | 500  | persistence layer failure                    |
//! | `Internal`             | 500  | anything else                                |

pub type Result<T> = std::result::Result<T, ModelForgeError>;

#[derive(Debug, thiserror::Error)]
pub enum ModelForgeError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("json guard failed: {0}")]
    JsonGuard(String),

    #[error("empty critical result: {0}")]
    EmptyCriticalResult(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// User-facing rendering of an error, distinct from the `Display` impl used
/// in logs (which may carry more internal detail in the future).
pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn code(&self) -> &'static str;
    fn http_status(&self) -> u16;
}

impl UserFriendlyError for ModelForgeError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn code(&self) -> &'static str {
        match self {
            ModelForgeError::Validation(_) => "validation_error",
            ModelForgeError::NotFound(_) => "not_found",
            ModelForgeError::Conflict(_) => "conflict",
            ModelForgeError::Unauthorized(_) => "unauthorized",
            ModelForgeError::Provider(_) => "provider_error",
            ModelForgeError::JsonGuard(_) => "json_guard_error",
            ModelForgeError::EmptyCriticalResult(_) => "empty_critical_result",
            ModelForgeError::Timeout(_) => "timeout",
            ModelForgeError::Store(_) => "store_error",
            ModelForgeError::Internal(_) => "internal_error",
        }
    }

    fn http_status(&self) -> u16 {
        match self {
            ModelForgeError::Validation(_) => 422,
            ModelForgeError::NotFound(_) => 404,
            ModelForgeError::Conflict(_) => 409,
            ModelForgeError::Unauthorized(_) => 401,
            ModelForgeError::Provider(_) => 502,
            ModelForgeError::JsonGuard(_) => 502,
            ModelForgeError::EmptyCriticalResult(_) => 502,
            ModelForgeError::Timeout(_) => 504,
            ModelForgeError::Store(_) => 500,
            ModelForgeError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_409() {
        let err = ModelForgeError::Conflict("duplicate job".into());
        assert_eq!(err.http_status(), 409);
        assert_eq!(err.code(), "conflict");
    }

    #[test]
    fn every_variant_has_distinct_code() {
        let errs: Vec<ModelForgeError> = vec![
            ModelForgeError::Validation("x".into()),
            ModelForgeError::NotFound("x".into()),
            ModelForgeError::Conflict("x".into()),
            ModelForgeError::Unauthorized("x".into()),
            ModelForgeError::Provider("x".into()),
            ModelForgeError::JsonGuard("x".into()),
            ModelForgeError::EmptyCriticalResult("x".into()),
            ModelForgeError::Timeout("x".into()),
            ModelForgeError::Store("x".into()),
            ModelForgeError::Internal("x".into()),
        ];
        let codes: std::collections::HashSet<_> = errs.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errs.len());
    }
}
