// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalized feedback for one screenshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub ux_insights: Vec<String>,
    pub visual_design: Vec<String>,
    pub best_practices: Vec<String>,
    pub annotations: Vec<Annotation>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.ux_insights.is_empty() && self.visual_design.is_empty() && self.best_practices.is_empty()
    }

    /// Maps annotation boxes from the analyzed image back onto the original one.
    pub fn rescale_annotations(&mut self, scale_x: f64, scale_y: f64) {
        for annotation in &mut self.annotations {
            annotation.x *= scale_x;
            annotation.width *= scale_x;
            annotation.y *= scale_y;
            annotation.height *= scale_y;
        }
    }
}

/// A rectangle on the screenshot, in pixels, with a note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
}

/// An uploaded image as received from the client.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub filename: Option<String>,
    pub media_type: String,
    pub data: Vec<u8>,
}

/// The bytes actually sent upstream, which may be a downscaled copy.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub media_type: String,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackReport {
    pub id: Uuid,
    pub provider: String,
    pub model: String,
    pub image: ImageInfo,
    pub feedback: AnalysisResult,
    pub metadata: ReportMetadata,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    pub filename: Option<String>,
    pub media_type: String,
    pub byte_size: usize,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub processing_time_ms: u64,
    pub strategy: Strategy,
    pub analyzed_width: u32,
    pub analyzed_height: u32,
}

/// Which normalization tier produced an [`AnalysisResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Structured,
    SectionScan,
    WholeText,
}
