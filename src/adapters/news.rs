//! Headline sources for the sentiment classifier.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::SentimentConfig;
use crate::error::{ConfluenceError, Result};

/// Entries read from each feed
const MAX_ITEMS_PER_FEED: usize = 20;

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
);

#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Up to `limit` recent headlines, newest first.
    ///
    /// An empty list is a valid answer; errors are reserved for a source that
    /// cannot be queried at all.
    async fn recent_headlines(
        &self,
        symbol: &str,
        limit: usize,
        max_age: Duration,
    ) -> Result<Vec<Headline>>;
}

// RSS 2.0 document shape; everything else in the feed is ignored
#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
}

/// Aggregates several RSS feeds fetched concurrently; a failing feed is skipped
pub struct RssNewsFeed {
    feeds: Vec<String>,
    http: Client,
    timeout: StdDuration,
}

impl RssNewsFeed {
    pub fn new(feeds: Vec<String>, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ConfluenceError::Internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            feeds,
            http,
            timeout: StdDuration::from_secs(timeout_secs),
        })
    }

    pub fn from_config(config: &SentimentConfig) -> Result<Self> {
        Self::new(config.feeds.clone(), config.feed_timeout_secs)
    }

    /// Fetch every feed at once; results come back in configured feed order
    async fn fetch_all(&self) -> Vec<Headline> {
        let mut tasks = JoinSet::new();
        for (index, url) in self.feeds.iter().enumerate() {
            let http = self.http.clone();
            let url = url.clone();
            let timeout = self.timeout;
            tasks.spawn(async move {
                let result = fetch_feed(&http, &url, timeout).await;
                (index, url, result)
            });
        }

        let mut fetched = Vec::with_capacity(self.feeds.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, url, Ok(items))) => {
                    debug!("NewsFeed: {} items from {}", items.len(), url);
                    fetched.push((index, items));
                }
                Ok((_, url, Err(e))) => warn!("NewsFeed: failed to fetch {}: {}", url, e),
                Err(e) => warn!("NewsFeed: fetch task failed: {}", e),
            }
        }

        fetched.sort_by_key(|(index, _)| *index);
        fetched.into_iter().flat_map(|(_, items)| items).collect()
    }
}

/// One feed, bounded by `timeout` from connect to the end of the body
async fn fetch_feed(http: &Client, url: &str, timeout: StdDuration) -> Result<Vec<Headline>> {
    let body = http
        .get(url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    parse_rss(&body)
}

#[async_trait]
impl NewsSource for RssNewsFeed {
    async fn recent_headlines(
        &self,
        _symbol: &str,
        limit: usize,
        max_age: Duration,
    ) -> Result<Vec<Headline>> {
        let all = self.fetch_all().await;

        if all.is_empty() {
            warn!("NewsFeed: no items from any feed");
            return Ok(all);
        }

        let headlines = select_recent(all, Utc::now(), max_age, limit);
        info!(
            "NewsFeed: {} headlines (limit={}, max_age={}m)",
            headlines.len(),
            limit,
            max_age.num_minutes()
        );
        Ok(headlines)
    }
}

/// Parse an RSS 2.0 document into headlines, dropping untitled items
pub fn parse_rss(xml: &str) -> Result<Vec<Headline>> {
    let doc: RssDocument =
        quick_xml::de::from_str(xml).map_err(|e| ConfluenceError::FeedParse(e.to_string()))?;

    Ok(doc
        .channel
        .items
        .into_iter()
        .take(MAX_ITEMS_PER_FEED)
        .filter_map(|item| {
            let title = item.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
            Some(Headline {
                title,
                link: item.link.map(|l| l.trim().to_string()).unwrap_or_default(),
                published: item.pub_date.as_deref().and_then(parse_pub_date),
            })
        })
        .collect())
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Keep items no older than `max_age` (undated items always pass), newest first.
///
/// When the age filter leaves nothing, all items are used instead.
pub fn select_recent(
    items: Vec<Headline>,
    now: DateTime<Utc>,
    max_age: Duration,
    limit: usize,
) -> Vec<Headline> {
    let fresh: Vec<Headline> = items
        .iter()
        .filter(|h| h.published.map_or(true, |p| now - p <= max_age))
        .cloned()
        .collect();

    let mut selected = if fresh.is_empty() { items } else { fresh };
    // Undated items sort last
    selected.sort_by(|a, b| b.published.cmp(&a.published));
    selected.truncate(limit);
    selected
}
