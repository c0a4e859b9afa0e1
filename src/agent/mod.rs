//! Language-model text classification and headline sentiment.
//!
//! Providers sit behind [`TextClassifier`]; [`ClassifierChain`] orders them
//! Gemini first, OpenAI second.

pub mod classifier;
pub mod gemini;
pub mod openai;
pub mod sentiment;

pub use classifier::{ClassifierChain, TextClassifier};
pub use gemini::{GeminiClassifier, GeminiConfig};
pub use openai::{OpenAiClassifier, OpenAiConfig};
pub use sentiment::SentimentClassifier;

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ClassifierConfig;
use crate::error::Result;

/// Chain of every provider that has an API key
pub fn build_classifier_chain(config: &ClassifierConfig) -> Result<ClassifierChain> {
    let mut providers: Vec<Arc<dyn TextClassifier>> = Vec::new();

    let gemini = GeminiClassifier::new(GeminiConfig::from_classifier(config))?;
    if gemini.is_configured() {
        providers.push(Arc::new(gemini));
    }

    let openai = OpenAiClassifier::new(OpenAiConfig::from_classifier(config))?;
    if openai.is_configured() {
        providers.push(Arc::new(openai));
    }

    if providers.is_empty() {
        warn!("No classifier API keys configured; sentiment will report classifier failures");
    } else {
        info!(
            "Classifier chain: {}",
            providers.iter().map(|p| p.name()).collect::<Vec<_>>().join(" -> ")
        );
    }

    Ok(ClassifierChain::new(providers))
}
