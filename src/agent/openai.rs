//! OpenAI chat-completions client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::classifier::TextClassifier;
use crate::config::ClassifierConfig;
use crate::error::{ConfluenceError, Result};

const PROVIDER: &str = "openai";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl OpenAiConfig {
    pub fn from_classifier(config: &ClassifierConfig) -> Self {
        Self {
            api_key: config.openai_api_key.clone().unwrap_or_default(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
            timeout_secs: config.timeout_secs,
            max_tokens: 80,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct OpenAiClassifier {
    config: OpenAiConfig,
    http: Client,
}

impl OpenAiClassifier {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ConfluenceError::Internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, http })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            max_tokens: self.config.max_tokens,
            temperature: 0.1,
        }
    }
}

#[async_trait]
impl TextClassifier for OpenAiClassifier {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn classify(&self, prompt: &str) -> Result<String> {
        if !self.is_configured() {
            return Err(ConfluenceError::classifier(PROVIDER, "API key not configured"));
        }

        debug!("Sending request to OpenAI ({})", self.config.model);

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("OpenAI API error: {} - {}", status, body);
            return Err(ConfluenceError::classifier(PROVIDER, format!("HTTP {}", status)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ConfluenceError::classifier(PROVIDER, format!("bad response: {}", e)))?;

        extract_content(body)
    }
}

fn extract_content(body: ChatResponse) -> Result<String> {
    body.choices
        .into_iter()
        .find_map(|c| c.message.content)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ConfluenceError::classifier(PROVIDER, "empty response"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> OpenAiClassifier {
        let mut config = OpenAiConfig::from_classifier(&ClassifierConfig::default());
        config.api_key = "sk-test".to_string();
        OpenAiClassifier::new(config).unwrap()
    }

    #[test]
    fn request_uses_configured_model_and_budget() {
        let request = configured().build_request("headlines");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4.1-mini");
        assert_eq!(json["max_tokens"], 80);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "headlines");
    }

    #[test]
    fn extracts_first_choice() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"id": "x", "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Bearish.\n"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(extract_content(body).unwrap(), "Bearish.");
    }

    #[test]
    fn null_content_is_an_error() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#,
        )
        .unwrap();
        assert!(extract_content(body).is_err());
    }
}
