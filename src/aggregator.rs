use crate::types::{FetchConfig, PipelineError, RawItem, Result, SourceConfig};
use async_trait::async_trait;
use chrono::Utc;
use encoding_rs::{Encoding, UTF_8};
use futures::future::join_all;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fetches and parses a single feed source. The production implementation
/// talks HTTP; tests substitute stubs.
#[async_trait]
pub trait FetchSource: Send + Sync {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<RawItem>>;
}

/// Fans out over the configured sources and concatenates their items.
pub struct FeedAggregator {
    fetcher: Arc<dyn FetchSource>,
    sources: Vec<SourceConfig>,
}

impl FeedAggregator {
    pub fn new(fetcher: Arc<dyn FetchSource>, sources: Vec<SourceConfig>) -> Self {
        Self { fetcher, sources }
    }

    /// Issues one concurrent fetch per source and joins them. A failing
    /// source logs and contributes an empty list; it never aborts its
    /// siblings. Results keep source-list order.
    pub async fn fetch_all(&self) -> Vec<RawItem> {
        let fetches = self.sources.iter().map(|source| {
            let fetcher = Arc::clone(&self.fetcher);
            async move {
                match fetcher.fetch(source).await {
                    Ok(items) => {
                        debug!("fetched {} items from {}", items.len(), source.url);
                        items
                    }
                    Err(err) => {
                        warn!("skipping source {}: {}", source.url, err);
                        Vec::new()
                    }
                }
            }
        });

        let results = join_all(fetches).await;
        let items: Vec<RawItem> = results.into_iter().flatten().collect();

        info!(
            "collected {} items from {} sources",
            items.len(),
            self.sources.len()
        );
        items
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }
}

/// HTTP fetcher with a bounded per-request timeout and charset-aware
/// decoding.
pub struct HttpSourceFetcher {
    client: Client,
}

impl HttpSourceFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .expect("failed to create HTTP client");

        Self { client }
    }
}

#[async_trait]
impl FetchSource for HttpSourceFetcher {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<RawItem>> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| PipelineError::SourceFetch(format!("{}: {}", source.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::SourceFetch(format!(
                "HTTP {} from {}",
                status, source.url
            )));
        }

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::SourceFetch(format!("{}: {}", source.url, e)))?;

        let body = decode_body(&bytes, charset.as_deref());
        parse_entries(source, &body)
    }
}

/// Parses feed content and extracts the normalized item fields. Entries
/// without a link are skipped.
pub fn parse_entries(source: &SourceConfig, body: &str) -> Result<Vec<RawItem>> {
    let feed = feed_rs::parser::parse(body.as_bytes())
        .map_err(|e| PipelineError::SourceFetch(format!("parse error for {}: {}", source.url, e)))?;

    let items = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry.links.first()?.href.clone();
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());

            Some(RawItem {
                title,
                link,
                published: entry.published.map(|dt| dt.with_timezone(&Utc)),
                source_url: source.url.clone(),
            })
        })
        .collect();

    Ok(items)
}

/// Decodes the response body using the declared charset, falling back to
/// UTF-8 with replacement on invalid bytes.
fn decode_body(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_from_content_type(value: &str) -> Option<String> {
    value.split(';').find_map(|part| {
        let part = part.trim();
        if part.len() >= 8 && part[..8].eq_ignore_ascii_case("charset=") {
            Some(part[8..].trim_matches('"').to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_is_extracted_from_content_type() {
        assert_eq!(
            charset_from_content_type("application/rss+xml; charset=windows-1251"),
            Some("windows-1251".to_string())
        );
        assert_eq!(
            charset_from_content_type("text/xml; CHARSET=\"utf-8\""),
            Some("utf-8".to_string())
        );
        assert_eq!(charset_from_content_type("text/xml"), None);
    }

    #[test]
    fn unknown_charset_falls_back_to_utf8() {
        let decoded = decode_body("привет".as_bytes(), Some("no-such-charset"));
        assert_eq!(decoded, "привет");
    }
}
