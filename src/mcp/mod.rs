// src/mcp/mod.rs
// MCP (Model Context Protocol) style tools exposing the feedback pipeline
use crate::errors::UxLensError;
use crate::models::Screenshot;
use crate::services::llm_service::Provider;
use crate::services::{AnalysisPipeline, normalizer, upload_validator};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

#[async_trait]
pub trait MCPTool: Send + Sync {
    async fn execute(&self, params: Value) -> Result<Value, UxLensError>;
    fn name(&self) -> &str;
    fn description(&self) -> &str;
}

fn parse_params<T: DeserializeOwned>(tool: &str, params: Value) -> Result<T, UxLensError> {
    serde_json::from_value(params)
        .map_err(|e| UxLensError::Validation(format!("Invalid parameters for {}: {}", tool, e)))
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, UxLensError> {
    serde_json::to_value(value).map_err(|e| UxLensError::Serialization(e.to_string()))
}

pub struct AnalyzeScreenshotTool {
    pipeline: Arc<AnalysisPipeline>,
    default_provider: Provider,
}

#[derive(Deserialize)]
struct AnalyzeParams {
    image_base64: String,
    media_type: String,
    filename: Option<String>,
    prompt: Option<String>,
    provider: Option<String>,
}

#[async_trait]
impl MCPTool for AnalyzeScreenshotTool {
    async fn execute(&self, params: Value) -> Result<Value, UxLensError> {
        let params: AnalyzeParams = parse_params(self.name(), params)?;

        let provider = match params.provider.as_deref() {
            Some(name) => name.parse::<Provider>()?,
            None => self.default_provider,
        };

        let data = general_purpose::STANDARD
            .decode(params.image_base64.trim())
            .map_err(|e| UxLensError::Validation(format!("image_base64 is not valid base64: {}", e)))?;

        let screenshot = Screenshot {
            filename: params.filename,
            media_type: params.media_type,
            data,
        };

        let report = self
            .pipeline
            .run(screenshot, provider, params.prompt.as_deref())
            .await?;

        to_value(&report)
    }

    fn name(&self) -> &str {
        "analyze_screenshot"
    }

    fn description(&self) -> &str {
        "Reviews a UI screenshot and returns UX, visual design and best practice feedback"
    }
}

pub struct NormalizeFeedbackTool;

#[derive(Deserialize)]
struct NormalizeParams {
    text: String,
}

#[async_trait]
impl MCPTool for NormalizeFeedbackTool {
    async fn execute(&self, params: Value) -> Result<Value, UxLensError> {
        let params: NormalizeParams = parse_params(self.name(), params)?;
        let (feedback, strategy) = normalizer::normalize_with_strategy(&params.text);

        Ok(json!({
            "strategy": strategy,
            "feedback": to_value(&feedback)?
        }))
    }

    fn name(&self) -> &str {
        "normalize_feedback"
    }

    fn description(&self) -> &str {
        "Turns a free-form model reply into categorized feedback"
    }
}

pub struct ValidateUploadTool;

#[derive(Deserialize)]
struct ValidateParams {
    media_type: String,
    byte_size: u64,
}

#[async_trait]
impl MCPTool for ValidateUploadTool {
    async fn execute(&self, params: Value) -> Result<Value, UxLensError> {
        let params: ValidateParams = parse_params(self.name(), params)?;

        Ok(match upload_validator::validate(&params.media_type, params.byte_size) {
            Ok(()) => json!({ "valid": true }),
            Err(rejection) => json!({ "valid": false, "reason": rejection.to_string() }),
        })
    }

    fn name(&self) -> &str {
        "validate_upload"
    }

    fn description(&self) -> &str {
        "Checks a file's media type and size against the upload policy"
    }
}

pub struct ToolRegistry {
    tools: Vec<Box<dyn MCPTool>>,
}

impl ToolRegistry {
    pub fn new(pipeline: Arc<AnalysisPipeline>, default_provider: Provider) -> Self {
        Self {
            tools: vec![
                Box::new(AnalyzeScreenshotTool {
                    pipeline,
                    default_provider,
                }),
                Box::new(NormalizeFeedbackTool),
                Box::new(ValidateUploadTool),
            ],
        }
    }

    pub fn describe(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| json!({ "name": tool.name(), "description": tool.description() }))
            .collect()
    }

    pub async fn call(&self, name: &str, params: Value) -> Result<Value, UxLensError> {
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.name() == name)
            .ok_or_else(|| UxLensError::Validation(format!("Unknown tool: {}", name)))?;

        tool.execute(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::{ImageProcessor, LLMService};

    fn registry() -> ToolRegistry {
        let pipeline = AnalysisPipeline::new(
            Arc::new(LLMService::new(&Config::default()).unwrap()),
            Arc::new(ImageProcessor::new()),
        );
        ToolRegistry::new(Arc::new(pipeline), Provider::OpenAI)
    }

    #[test]
    fn lists_every_tool() {
        let names: Vec<_> = registry()
            .describe()
            .into_iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            ["analyze_screenshot", "normalize_feedback", "validate_upload"]
        );
    }

    #[tokio::test]
    async fn normalize_tool_reports_strategy() {
        let out = registry()
            .call(
                "normalize_feedback",
                json!({ "text": "Visual\n- Tighten spacing" }),
            )
            .await
            .unwrap();
        assert_eq!(out["strategy"], "section_scan");
        assert_eq!(out["feedback"]["visualDesign"], json!(["Tighten spacing"]));
        assert_eq!(out["feedback"]["uxInsights"], json!([]));
    }

    #[tokio::test]
    async fn validate_tool_explains_rejections() {
        let registry = registry();
        let ok = registry
            .call("validate_upload", json!({ "media_type": "image/png", "byte_size": 10 }))
            .await
            .unwrap();
        assert_eq!(ok, json!({ "valid": true }));

        let too_big = registry
            .call(
                "validate_upload",
                json!({ "media_type": "image/png", "byte_size": 6_000_000 }),
            )
            .await
            .unwrap();
        assert_eq!(too_big["valid"], false);
        assert!(too_big["reason"].as_str().unwrap().contains("6000000"));
    }

    #[tokio::test]
    async fn analyze_tool_validates_before_calling_out() {
        let err = registry()
            .call(
                "analyze_screenshot",
                json!({ "image_base64": "aGVsbG8=", "media_type": "image/svg+xml" }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UxLensError::Rejected(_)));

        let err = registry()
            .call(
                "analyze_screenshot",
                json!({ "image_base64": "aGVsbG8=", "media_type": "image/png", "provider": "gemini" }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UxLensError::InvalidProvider(_)));
    }

    #[tokio::test]
    async fn unknown_tools_and_bad_params_are_validation_errors() {
        let registry = registry();
        assert!(matches!(
            registry.call("style_transfer", json!({})).await,
            Err(UxLensError::Validation(_))
        ));
        assert!(matches!(
            registry.call("normalize_feedback", json!({ "body": "x" })).await,
            Err(UxLensError::Validation(_))
        ));
    }
}
