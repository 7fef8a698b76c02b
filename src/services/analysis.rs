// src/services/analysis.rs
use crate::errors::UxLensError;
use crate::models::{FeedbackReport, ImageInfo, ReportMetadata, Screenshot};
use crate::services::llm_service::Provider;
use crate::services::{ImageProcessor, LLMService, normalizer, upload_validator};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Validate, prepare, ask the model, normalize: one screenshot in, one report out.
pub struct AnalysisPipeline {
    llm_service: Arc<LLMService>,
    image_processor: Arc<ImageProcessor>,
}

impl AnalysisPipeline {
    pub fn new(llm_service: Arc<LLMService>, image_processor: Arc<ImageProcessor>) -> Self {
        Self {
            llm_service,
            image_processor,
        }
    }

    pub async fn run(
        &self,
        screenshot: Screenshot,
        provider: Provider,
        prompt: Option<&str>,
    ) -> Result<FeedbackReport, UxLensError> {
        let start = Instant::now();

        if let Err(rejection) =
            upload_validator::validate(&screenshot.media_type, screenshot.data.len() as u64)
        {
            warn!("Rejected upload {:?}: {}", screenshot.filename, rejection);
            return Err(rejection.into());
        }

        let (width, height) = self.image_processor.dimensions(&screenshot.data)?;
        let prepared = self.image_processor.prepare_for(provider, &screenshot)?;

        let raw = self
            .llm_service
            .request_feedback(provider, &prepared, prompt)
            .await?;

        let (mut feedback, strategy) = normalizer::normalize_with_strategy(&raw);

        if (prepared.width, prepared.height) != (width, height)
            && prepared.width > 0
            && prepared.height > 0
        {
            feedback.rescale_annotations(
                width as f64 / prepared.width as f64,
                height as f64 / prepared.height as f64,
            );
        }

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Analyzed {:?} ({}x{}) with {} in {}ms via {:?}",
            screenshot.filename, width, height, provider, processing_time_ms, strategy
        );

        Ok(FeedbackReport {
            id: Uuid::new_v4(),
            provider: provider.to_string(),
            model: self.llm_service.model_for(provider).to_string(),
            image: ImageInfo {
                filename: screenshot.filename,
                media_type: screenshot.media_type,
                byte_size: screenshot.data.len(),
                width,
                height,
            },
            feedback,
            metadata: ReportMetadata {
                processing_time_ms,
                strategy,
                analyzed_width: prepared.width,
                analyzed_height: prepared.height,
            },
            created_at: chrono::Utc::now(),
        })
    }
}
