// src/services/upload_validator.rs
use serde::Serialize;
use thiserror::Error;

pub const ALLOWED_MEDIA_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// 5 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Unsupported file type '{0}'. Please upload a JPEG, PNG, GIF, or WebP image")]
    UnsupportedFormat(String),

    #[error("File is {size} bytes; images must be at most {limit} bytes (5MB)")]
    TooLarge { size: u64, limit: u64 },
}

pub type ValidationOutcome = Result<(), Rejection>;

/// A file the caller wants to upload, described by what it claims to be.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub media_type: String,
    pub byte_size: u64,
}

impl UploadCandidate {
    pub fn new(media_type: impl Into<String>, byte_size: u64) -> Self {
        Self {
            media_type: media_type.into(),
            byte_size,
        }
    }

    pub fn validate(&self) -> ValidationOutcome {
        validate(&self.media_type, self.byte_size)
    }
}

/// Checks the declared media type, then the size. Only the first failure is reported.
pub fn validate(media_type: &str, byte_size: u64) -> ValidationOutcome {
    if !ALLOWED_MEDIA_TYPES.contains(&media_type) {
        return Err(Rejection::UnsupportedFormat(media_type.to_string()));
    }

    if byte_size > MAX_UPLOAD_BYTES {
        return Err(Rejection::TooLarge {
            size: byte_size,
            limit: MAX_UPLOAD_BYTES,
        });
    }

    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPolicy {
    pub allowed_types: Vec<&'static str>,
    pub max_bytes: u64,
}

pub fn upload_policy() -> UploadPolicy {
    UploadPolicy {
        allowed_types: ALLOWED_MEDIA_TYPES.to_vec(),
        max_bytes: MAX_UPLOAD_BYTES,
    }
}
