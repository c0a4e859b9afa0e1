//! Gemini REST client (generateContent)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::classifier::TextClassifier;
use crate::config::ClassifierConfig;
use crate::error::{ConfluenceError, Result};

const PROVIDER: &str = "gemini";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn from_classifier(config: &ClassifierConfig) -> Self {
        Self {
            api_key: config.gemini_api_key.clone().unwrap_or_default(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

pub struct GeminiClassifier {
    config: GeminiConfig,
    http: Client,
}

impl GeminiClassifier {
    pub fn new(config: GeminiConfig) -> Result<Self> {
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

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }
}

#[async_trait]
impl TextClassifier for GeminiClassifier {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn classify(&self, prompt: &str) -> Result<String> {
        if !self.is_configured() {
            return Err(ConfluenceError::classifier(PROVIDER, "API key not configured"));
        }

        debug!("Sending request to Gemini ({})", self.config.model);

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API error: {} - {}", status, body);
            return Err(ConfluenceError::classifier(PROVIDER, format!("HTTP {}", status)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ConfluenceError::classifier(PROVIDER, format!("bad response: {}", e)))?;

        extract_text(body)
    }
}

fn extract_text(body: GenerateResponse) -> Result<String> {
    body.candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ConfluenceError::classifier(PROVIDER, "empty response"))
}
