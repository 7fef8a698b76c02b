// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

use crate::services::upload_validator::Rejection;

#[derive(Error, Debug)]
pub enum UxLensError {
    #[error("LLM service error: {0}")]
    LLM(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid provider: {0}")]
    InvalidProvider(String),
}

impl UxLensError {
    fn label(&self) -> &'static str {
        match self {
            UxLensError::LLM(_) => "AI service error",
            UxLensError::ImageProcessing(_) => "Image processing error",
            UxLensError::Rejected(Rejection::UnsupportedFormat(_)) => "Unsupported file type",
            UxLensError::Rejected(Rejection::TooLarge { .. }) => "File too large",
            UxLensError::Serialization(_) => "Data processing error",
            UxLensError::Validation(_) => "Validation error",
            UxLensError::InvalidProvider(_) => "Invalid provider",
        }
    }
}

impl ResponseError for UxLensError {
    fn status_code(&self) -> StatusCode {
        match self {
            UxLensError::LLM(_) => StatusCode::SERVICE_UNAVAILABLE,
            UxLensError::Rejected(Rejection::UnsupportedFormat(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            UxLensError::Rejected(Rejection::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            UxLensError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            UxLensError::ImageProcessing(_)
            | UxLensError::Validation(_)
            | UxLensError::InvalidProvider(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.label(),
            "message": self.to_string()
        }))
    }
}
