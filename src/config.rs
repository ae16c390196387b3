use crate::types::{PipelineError, Result, SourceConfig};
use std::env;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite:news-relay.db";
const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 3 * 60 * 60;

/// Everything the pipeline consumes from the environment, validated at
/// startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub chat_id: i64,
    pub thread_id: Option<i64>,
    pub database_url: String,
    pub summarizer_base_url: String,
    pub feed_urls: Vec<String>,
    pub cycle_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token = require("TELEGRAM_BOT_TOKEN")?;

        let chat_id = require("CHAT_ID")?
            .parse::<i64>()
            .map_err(|_| PipelineError::Config("CHAT_ID must be an integer".to_string()))?;

        let thread_id = match env::var("THREAD_ID") {
            Ok(value) if !value.trim().is_empty() => Some(value.trim().parse::<i64>().map_err(
                |_| PipelineError::Config("THREAD_ID must be an integer".to_string()),
            )?),
            _ => None,
        };

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let summarizer_base_url = require("SUMMARIZER_BASE_URL")?;

        let feed_urls: Vec<String> = require("FEED_URLS")?
            .split(',')
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();

        if feed_urls.is_empty() {
            return Err(PipelineError::Config(
                "FEED_URLS must list at least one feed".to_string(),
            ));
        }

        let cycle_interval = match env::var("CYCLE_INTERVAL_SECS") {
            Ok(value) => {
                let secs = value.trim().parse::<u64>().map_err(|_| {
                    PipelineError::Config("CYCLE_INTERVAL_SECS must be an integer".to_string())
                })?;
                if secs == 0 {
                    return Err(PipelineError::Config(
                        "CYCLE_INTERVAL_SECS must be positive".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_CYCLE_INTERVAL_SECS),
        };

        Ok(Self {
            bot_token,
            chat_id,
            thread_id,
            database_url,
            summarizer_base_url,
            feed_urls,
            cycle_interval,
        })
    }

    pub fn sources(&self) -> Vec<SourceConfig> {
        self.feed_urls
            .iter()
            .map(|url| SourceConfig::from_url(url))
            .collect()
    }
}

fn require(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PipelineError::Config(format!("{name} is not set"))),
    }
}
