//! Text classification behind a single trait, with ordered fallback.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ConfluenceError, Result};

/// Free-text completion used to label headline sentiment
#[async_trait]
pub trait TextClassifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, prompt: &str) -> Result<String>;
}

/// Tries each provider in order and returns the first success
pub struct ClassifierChain {
    providers: Vec<Arc<dyn TextClassifier>>,
}

impl ClassifierChain {
    pub fn new(providers: Vec<Arc<dyn TextClassifier>>) -> Self {
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

#[async_trait]
impl TextClassifier for ClassifierChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn classify(&self, prompt: &str) -> Result<String> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.classify(prompt).await {
                Ok(text) => {
                    debug!("Classifier {} answered", provider.name());
                    return Ok(text);
                }
                Err(e) => {
                    warn!("Classifier {} failed, falling back: {}", provider.name(), e);
                    failures.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        if failures.is_empty() {
            return Err(ConfluenceError::classifier("chain", "no providers configured"));
        }
        Err(ConfluenceError::classifier("chain", failures.join("; ")))
    }
}
