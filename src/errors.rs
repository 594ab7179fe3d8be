// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StudioError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Image preprocessing error: {0}")]
    Preprocess(String),

    #[error("Outfit analysis error: {0}")]
    Analysis(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StudioError {
    /// The message without the kind prefix, as shown in the error list.
    pub fn message(&self) -> &str {
        match self {
            StudioError::Validation(m)
            | StudioError::Preprocess(m)
            | StudioError::Analysis(m)
            | StudioError::Generation(m)
            | StudioError::Busy(m)
            | StudioError::NotFound(m)
            | StudioError::Config(m) => m,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            StudioError::Validation(_) => "Validation error",
            StudioError::Preprocess(_) => "Image processing error",
            StudioError::Analysis(_) => "Analysis error",
            StudioError::Generation(_) => "AI service error",
            StudioError::Busy(_) => "Busy",
            StudioError::NotFound(_) => "Not found",
            StudioError::Config(_) => "Configuration error",
        }
    }
}

impl ResponseError for StudioError {
    fn status_code(&self) -> StatusCode {
        match self {
            StudioError::Validation(_) | StudioError::Preprocess(_) => StatusCode::BAD_REQUEST,
            StudioError::Analysis(_) | StudioError::Generation(_) => StatusCode::BAD_GATEWAY,
            StudioError::Busy(_) => StatusCode::CONFLICT,
            StudioError::NotFound(_) => StatusCode::NOT_FOUND,
            StudioError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.kind(),
            "message": self.message()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            StudioError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StudioError::Generation("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(StudioError::Busy("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            StudioError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn message_strips_kind_prefix() {
        let err = StudioError::Analysis("field `outfit` missing".into());
        assert_eq!(err.message(), "field `outfit` missing");
        assert_eq!(err.to_string(), "Outfit analysis error: field `outfit` missing");
    }
}
