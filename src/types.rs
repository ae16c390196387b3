use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One entry extracted from a syndication feed, before deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub source_url: String,
}

/// A canonical news item. The URL is globally unique and acts as the
/// dedup key; rows are immutable once inserted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub source_id: Option<i64>,
    pub published_at: DateTime<Utc>,
}

/// Identity of a syndication origin, created lazily the first time an
/// item from it is ingested.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeedSource {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub kind: String,
}

/// A feed source as configured, before it exists in the store.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub kind: String,
}

impl SourceConfig {
    /// Build a source entry from a bare URL, deriving the display name
    /// from the host.
    pub fn from_url(url: &str) -> Self {
        let name = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
            .unwrap_or_else(|| url.to_string());

        Self {
            name,
            url: url.to_string(),
            kind: "rss".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "news-relay/0.1".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Knobs for one sync-and-deliver cycle. Tests zero the delays.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// Attempt budget for the summarize+deliver step of a single item.
    pub max_attempts: u32,
    /// Fixed delay between attempts for the same item.
    pub retry_delay: Duration,
    /// Throttle between successfully delivered items.
    pub send_delay: Duration,
    /// Minimum length of a sanitized summary; shorter results fail the attempt.
    pub min_summary_chars: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(30),
            send_delay: Duration::from_secs(10),
            min_summary_chars: 50,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("source fetch failed: {0}")]
    SourceFetch(String),

    #[error("summarization failed: {0}")]
    Summarization(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("item {0} already has a delivery record")]
    AlreadyDelivered(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
