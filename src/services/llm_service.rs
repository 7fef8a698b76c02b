// src/services/llm_service.rs
use crate::config::Config;
use crate::errors::UxLensError;
use crate::models::PreparedImage;
use base64::{Engine as _, engine::general_purpose};
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

const SYSTEM_PROMPT: &str = r#"You are a senior UX designer reviewing a screenshot of a user interface.
Give concrete, actionable feedback grouped into three categories:
- uxInsights: usability, flow, clarity and accessibility problems
- visualDesign: layout, typography, color, spacing and hierarchy
- bestPractices: conventions and standards the interface should follow

Where a finding refers to a specific area of the screenshot, add an annotation
with a bounding box in pixel coordinates of the image you were given.

Respond with JSON only, matching this structure:
{
    "uxInsights": ["..."],
    "visualDesign": ["..."],
    "bestPractices": ["..."],
    "annotations": [
        {"x": 0, "y": 0, "width": 0, "height": 0, "text": "..."}
    ]
}"#;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Anthropic,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UxLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            _ => Err(UxLensError::InvalidProvider(s.to_string())),
        }
    }
}

pub struct LLMService {
    openai_key: Option<String>,
    openai_model: String,
    openai_base_url: String,
    anthropic_key: Option<String>,
    anthropic_model: String,
    anthropic_base_url: String,
    max_tokens: u32,
    client: Client,
}

impl LLMService {
    pub fn new(config: &Config) -> Result<Self, UxLensError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| UxLensError::LLM(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            openai_key: config.openai_api_key.clone(),
            openai_model: config.openai_model.clone(),
            openai_base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            anthropic_key: config.anthropic_api_key.clone(),
            anthropic_model: config.anthropic_model.clone(),
            anthropic_base_url: config.anthropic_base_url.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
            client,
        })
    }

    pub fn model_for(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAI => &self.openai_model,
            Provider::Anthropic => &self.anthropic_model,
        }
    }

    /// Sends the screenshot upstream and returns the assistant's raw reply text.
    pub async fn request_feedback(
        &self,
        provider: Provider,
        image: &PreparedImage,
        prompt: Option<&str>,
    ) -> Result<String, UxLensError> {
        let instruction = user_instruction(image, prompt);

        let reply = match provider {
            Provider::OpenAI => self.request_openai(image, &instruction).await,
            Provider::Anthropic => self.request_anthropic(image, &instruction).await,
        };

        match &reply {
            Ok(text) => debug!("{} replied with {} bytes", provider, text.len()),
            Err(e) => warn!("{} request failed: {}", provider, e),
        }
        reply
    }

    async fn request_openai(
        &self,
        image: &PreparedImage,
        instruction: &str,
    ) -> Result<String, UxLensError> {
        let api_key = self
            .openai_key
            .as_ref()
            .ok_or_else(|| UxLensError::LLM("OpenAI API key not configured".to_string()))?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.openai_base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&openai_body(&self.openai_model, self.max_tokens, image, instruction))
            .send()
            .await
            .map_err(|e| UxLensError::LLM(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UxLensError::LLM(format!(
                "OpenAI error ({}): {}",
                status, error_text
            )));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| UxLensError::LLM(format!("Failed to parse OpenAI response: {}", e)))?;

        openai_content(&result)
    }

    async fn request_anthropic(
        &self,
        image: &PreparedImage,
        instruction: &str,
    ) -> Result<String, UxLensError> {
        let api_key = self
            .anthropic_key
            .as_ref()
            .ok_or_else(|| UxLensError::LLM("Anthropic API key not configured".to_string()))?;

        let response = self
            .client
            .post(format!("{}/messages", self.anthropic_base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&anthropic_body(
                &self.anthropic_model,
                self.max_tokens,
                image,
                instruction,
            ))
            .send()
            .await
            .map_err(|e| UxLensError::LLM(format!("Anthropic request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UxLensError::LLM(format!(
                "Anthropic error ({}): {}",
                status, error_text
            )));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| UxLensError::LLM(format!("Failed to parse Anthropic response: {}", e)))?;

        anthropic_content(&result)
    }
}

fn user_instruction(image: &PreparedImage, prompt: Option<&str>) -> String {
    let mut instruction = format!(
        "Analyze this UI screenshot and provide UX feedback. \
         The image is {}x{} pixels; give annotation coordinates in that space.",
        image.width, image.height
    );

    if let Some(extra) = prompt.map(str::trim).filter(|p| !p.is_empty()) {
        instruction.push_str("\n\nAdditional context from the user:\n");
        instruction.push_str(extra);
    }

    instruction
}

fn openai_body(model: &str, max_tokens: u32, image: &PreparedImage, instruction: &str) -> Value {
    let base64_image = general_purpose::STANDARD.encode(&image.data);

    json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": SYSTEM_PROMPT
            },
            {
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": instruction
                    },
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:{};base64,{}", image.media_type, base64_image)
                        }
                    }
                ]
            }
        ],
        "max_tokens": max_tokens
    })
}

fn anthropic_body(model: &str, max_tokens: u32, image: &PreparedImage, instruction: &str) -> Value {
    let base64_image = general_purpose::STANDARD.encode(&image.data);

    json!({
        "model": model,
        "max_tokens": max_tokens,
        "system": SYSTEM_PROMPT,
        "messages": [{
            "role": "user",
            "content": [
                {
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": image.media_type,
                        "data": base64_image
                    }
                },
                {
                    "type": "text",
                    "text": instruction
                }
            ]
        }]
    })
}

fn openai_content(result: &Value) -> Result<String, UxLensError> {
    result["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| UxLensError::LLM("No content in OpenAI response".to_string()))
}

fn anthropic_content(result: &Value) -> Result<String, UxLensError> {
    result["content"]
        .as_array()
        .and_then(|blocks| blocks.iter().find(|b| b["type"] == "text"))
        .and_then(|block| block["text"].as_str())
        .map(str::to_string)
        .ok_or_else(|| UxLensError::LLM("No content in Anthropic response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> PreparedImage {
        PreparedImage {
            media_type: "image/webp".into(),
            data: vec![1, 2, 3, 4],
            width: 1280,
            height: 720,
        }
    }

    #[test]
    fn parses_provider_names() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAI);
        assert_eq!(" Anthropic ".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert!(matches!(
            "gemini".parse::<Provider>(),
            Err(UxLensError::InvalidProvider(name)) if name == "gemini"
        ));
    }

    #[test]
    fn instruction_mentions_dimensions_and_user_prompt() {
        let image = sample_image();
        let plain = user_instruction(&image, None);
        assert!(plain.contains("1280x720"));
        assert!(!plain.contains("Additional context"));

        let blank = user_instruction(&image, Some("   "));
        assert_eq!(blank, plain);

        let with_prompt = user_instruction(&image, Some("Checkout page for mobile"));
        assert!(with_prompt.ends_with("Checkout page for mobile"));
    }

    #[test]
    fn openai_body_embeds_a_data_url() {
        let body = openai_body("gpt-4o", 900, &sample_image(), "look");
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 900);
        assert_eq!(body["messages"][0]["role"], "system");
        let url = body["messages"][1]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap();
        assert_eq!(url, "data:image/webp;base64,AQIDBA==");
    }

    #[test]
    fn anthropic_body_uses_a_base64_source() {
        let body = anthropic_body("claude", 900, &sample_image(), "look");
        assert!(body["system"].as_str().unwrap().contains("uxInsights"));
        let source = &body["messages"][0]["content"][0]["source"];
        assert_eq!(source["media_type"], "image/webp");
        assert_eq!(source["data"], "AQIDBA==");
        assert_eq!(body["messages"][0]["content"][1]["text"], "look");
    }

    #[test]
    fn extracts_reply_text() {
        let openai = json!({"choices": [{"message": {"content": "- tidy up"}}]});
        assert_eq!(openai_content(&openai).unwrap(), "- tidy up");
        assert!(openai_content(&json!({"choices": []})).is_err());

        let anthropic = json!({"content": [
            {"type": "thinking", "thinking": "..."},
            {"type": "text", "text": "{\"uxInsights\": []}"}
        ]});
        assert_eq!(anthropic_content(&anthropic).unwrap(), "{\"uxInsights\": []}");
        assert!(anthropic_content(&json!({"content": []})).is_err());
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let service = LLMService::new(&Config::default()).unwrap();
        let err = service
            .request_feedback(Provider::Anthropic, &sample_image(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Anthropic API key not configured"));
    }
}
