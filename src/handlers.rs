// src/handlers.rs
use crate::services::llm_service::Provider;
use crate::services::upload_validator::{self, UploadCandidate};
use crate::services::normalizer;
use crate::{AppState, errors::UxLensError, models::Screenshot};
use actix_multipart::{Field, Multipart};
use actix_web::{Error, HttpResponse, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use log::warn;
use std::collections::HashMap;

const MAX_PROMPT_BYTES: u64 = 16 * 1024;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/analyze", web::post().to(analyze_screenshot))
            .route("/normalize", web::post().to(normalize_reply))
            .route("/upload-policy", web::get().to(upload_policy)),
    )
    .service(
        web::scope("/mcp")
            .route("/tools", web::get().to(list_tools))
            .route("/tools/{name}", web::post().to(call_tool)),
    )
    .route("/health", web::get().to(health_check));
}

/// Reads a whole field, counting every byte but buffering at most `cap`.
async fn read_capped(field: &mut Field, cap: u64) -> Result<(BytesMut, u64), Error> {
    let mut buffer = BytesMut::new();
    let mut total: u64 = 0;

    while let Some(chunk) = field.try_next().await? {
        total += chunk.len() as u64;
        if total <= cap {
            buffer.extend_from_slice(&chunk);
        }
    }

    Ok((buffer, total))
}

pub async fn analyze_screenshot(
    mut payload: Multipart,
    data: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, Error> {
    let provider = match query.get("provider") {
        Some(name) => name.parse::<Provider>()?,
        None => data.default_provider,
    };

    let mut screenshot = None;
    let mut prompt = None;

    while let Some(mut field) = payload.try_next().await? {
        let field_name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        match field_name.as_str() {
            "image" | "file" => {
                let filename = field
                    .content_disposition()
                    .get_filename()
                    .map(|name| name.to_string());

                let media_type = field
                    .content_type()
                    .map(|ct| ct.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let (image_data, byte_size) =
                    read_capped(&mut field, upload_validator::MAX_UPLOAD_BYTES).await?;

                // Validate before anything leaves the service
                let candidate = UploadCandidate::new(media_type.as_str(), byte_size);
                if let Err(rejection) = candidate.validate() {
                    warn!("Rejected upload {:?}: {}", filename, rejection);
                    return Err(UxLensError::from(rejection).into());
                }

                screenshot = Some(Screenshot {
                    filename,
                    media_type,
                    data: image_data.to_vec(),
                });
            }
            "prompt" => {
                let (text, size) = read_capped(&mut field, MAX_PROMPT_BYTES).await?;
                if size > MAX_PROMPT_BYTES {
                    return Err(UxLensError::Validation(format!(
                        "Prompt exceeds {} bytes",
                        MAX_PROMPT_BYTES
                    ))
                    .into());
                }
                let text = String::from_utf8(text.to_vec()).map_err(|_| {
                    UxLensError::Validation("Prompt must be UTF-8 text".to_string())
                })?;
                prompt = Some(text);
            }
            _ => {
                while field.try_next().await?.is_some() {}
            }
        }
    }

    let screenshot = screenshot.ok_or_else(|| {
        UxLensError::Validation("No image provided; send it in an 'image' field".to_string())
    })?;

    let report = data
        .pipeline
        .run(screenshot, provider, prompt.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(&report))
}

pub async fn normalize_reply(body: String) -> HttpResponse {
    let (feedback, strategy) = normalizer::normalize_with_strategy(&body);

    HttpResponse::Ok().json(serde_json::json!({
        "strategy": strategy,
        "feedback": feedback
    }))
}

pub async fn upload_policy() -> HttpResponse {
    HttpResponse::Ok().json(upload_validator::upload_policy())
}

pub async fn list_tools(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "tools": data.tools.describe()
    }))
}

pub async fn call_tool(
    path: web::Path<String>,
    data: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, Error> {
    let name = path.into_inner();
    let result = data.tools.call(&name, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(result))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "uxlens",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
