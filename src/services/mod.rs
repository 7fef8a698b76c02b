// src/services/mod.rs
pub mod analysis;
pub mod image_processor;
pub mod llm_service;
pub mod normalizer;
pub mod upload_validator;

pub use analysis::AnalysisPipeline;
pub use image_processor::ImageProcessor;
pub use llm_service::LLMService;
