//! Headline sentiment: news in, {bullish, bearish, neutral} out.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::classifier::TextClassifier;
use crate::adapters::news::NewsSource;
use crate::config::SentimentConfig;
use crate::domain::{Sentiment, SentimentVerdict};

/// Confidence attached to a keyword-matched AI label
pub const AI_LABEL_CONFIDENCE: f64 = 0.7;
/// Confidence when the AI answer carries no directional keyword
pub const AI_NEUTRAL_CONFIDENCE: f64 = 0.4;
/// Confidence when there is nothing to classify or the classifier failed
pub const FALLBACK_CONFIDENCE: f64 = 0.1;

const BULLISH_KEYWORDS: [&str; 4] = ["bull", "up", "buy", "rally"];
const BEARISH_KEYWORDS: [&str; 4] = ["bear", "down", "sell", "drop"];

pub struct SentimentClassifier {
    news: Arc<dyn NewsSource>,
    classifier: Arc<dyn TextClassifier>,
    config: SentimentConfig,
}

impl SentimentClassifier {
    pub fn new(
        news: Arc<dyn NewsSource>,
        classifier: Arc<dyn TextClassifier>,
        config: SentimentConfig,
    ) -> Self {
        Self {
            news,
            classifier,
            config,
        }
    }

    /// Classify recent headlines for `symbol`. Never fails; every degraded
    /// path returns a low-confidence neutral verdict with its reason.
    pub async fn analyze(&self, symbol: &str) -> SentimentVerdict {
        if !self.config.enabled {
            return SentimentVerdict::neutral(0.0, "disabled");
        }

        let max_age = Duration::minutes(self.config.max_age_minutes);
        let headlines = match self
            .news
            .recent_headlines(symbol, self.config.headline_limit, max_age)
            .await
        {
            Ok(headlines) => headlines,
            Err(e) => {
                warn!("Sentiment: news source failed: {}", e);
                Vec::new()
            }
        };

        if headlines.is_empty() {
            return SentimentVerdict::neutral(FALLBACK_CONFIDENCE, "no_news");
        }

        let text = headlines
            .iter()
            .map(|h| h.title.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!("Analyze financial sentiment from these headlines:\n{}", text);

        debug!(
            "Sentiment: classifying {} headlines via {}",
            headlines.len(),
            self.classifier.name()
        );

        let mut verdict = match self.classifier.classify(&prompt).await {
            Ok(answer) => label_answer(&answer),
            Err(e) => {
                warn!("Sentiment: classifier failed: {}", e);
                SentimentVerdict::neutral(FALLBACK_CONFIDENCE, "exception")
            }
        };
        verdict.headlines = headlines.len();

        info!(
            "Sentiment: {} conf={:.2} reason={} headlines={}",
            verdict.sentiment, verdict.confidence, verdict.reason, verdict.headlines
        );
        verdict
    }
}

/// Map a free-text answer onto the sentiment vocabulary by keyword.
/// Bullish keywords are checked first.
pub fn label_answer(answer: &str) -> SentimentVerdict {
    let lower = answer.to_lowercase();
    let (sentiment, confidence, reason) = if BULLISH_KEYWORDS.iter().any(|k| lower.contains(k)) {
        (Sentiment::Bullish, AI_LABEL_CONFIDENCE, "ai_bullish")
    } else if BEARISH_KEYWORDS.iter().any(|k| lower.contains(k)) {
        (Sentiment::Bearish, AI_LABEL_CONFIDENCE, "ai_bearish")
    } else {
        (Sentiment::Neutral, AI_NEUTRAL_CONFIDENCE, "ai_neutral")
    };

    SentimentVerdict {
        sentiment,
        confidence,
        reason: reason.to_string(),
        headlines: 0,
    }
}
