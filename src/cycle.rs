use crate::aggregator::FeedAggregator;
use crate::deliver::{DeliverMessage, ParseMode};
use crate::retry;
use crate::sanitizer::sanitize;
use crate::store::NewsStore;
use crate::summarizer::Summarize;
use crate::tracker::PublicationTracker;
use crate::types::{CycleConfig, NewsItem, PipelineError, Result};
use backoff::backoff::Constant;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Counters for one cycle, logged for observability.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub inserted: u64,
    pub pending: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Ties the pipeline together: sync new items, fetch unsent ones,
/// summarize and deliver each with a bounded retry budget, throttle
/// between sends.
pub struct CycleOrchestrator {
    aggregator: FeedAggregator,
    store: NewsStore,
    tracker: PublicationTracker,
    summarizer: Arc<dyn Summarize>,
    delivery: Arc<dyn DeliverMessage>,
    config: CycleConfig,
}

impl CycleOrchestrator {
    pub fn new(
        aggregator: FeedAggregator,
        store: NewsStore,
        tracker: PublicationTracker,
        summarizer: Arc<dyn Summarize>,
        delivery: Arc<dyn DeliverMessage>,
        config: CycleConfig,
    ) -> Self {
        Self {
            aggregator,
            store,
            tracker,
            summarizer,
            delivery,
            config,
        }
    }

    /// One full cycle. Per-item failures are contained: an item that
    /// exhausts its attempts stays unsent and re-enters the candidate set
    /// next cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        let raw_items = self.aggregator.fetch_all().await;
        report.fetched = raw_items.len();
        report.inserted = self.store.sync_new(&raw_items).await?;

        let pending = self.tracker.unsent_items().await?;
        report.pending = pending.len();

        if pending.is_empty() {
            info!("no unsent items, nothing to deliver");
            return Ok(report);
        }

        info!("delivering {} unsent items", pending.len());

        for item in &pending {
            match self.publish_item(item).await {
                Ok(()) => {
                    report.delivered += 1;
                    tokio::time::sleep(self.config.send_delay).await;
                }
                Err(err) => {
                    error!("giving up on {} for this cycle: {}", item.url, err);
                    report.failed += 1;
                }
            }
        }

        info!(
            "cycle done: {} fetched, {} inserted, {} delivered, {} still pending",
            report.fetched, report.inserted, report.delivered, report.failed
        );
        Ok(report)
    }

    /// Summarize, sanitize, gate on the quality floor and deliver one
    /// item, retrying the whole step on failure. The delivery record is
    /// written only after a confirmed send.
    async fn publish_item(&self, item: &NewsItem) -> Result<()> {
        retry::bounded(
            self.config.max_attempts,
            Constant::new(self.config.retry_delay),
            |attempt| async move {
                debug!("attempt {} for {}", attempt, item.url);

                let summary = self.summarizer.summarize(&item.url).await;
                let text = sanitize(&summary);

                if text.chars().count() < self.config.min_summary_chars {
                    return Err(PipelineError::Summarization(format!(
                        "summary for {} is below the {}-character floor",
                        item.url, self.config.min_summary_chars
                    )));
                }

                self.send_with_fallback(&text).await
            },
        )
        .await?;

        self.tracker.mark_sent(item.id).await
    }

    /// Malformed escaping can still slip through generated output, so a
    /// rejected formatted send falls back to one unformatted send.
    async fn send_with_fallback(&self, text: &str) -> Result<()> {
        match self.delivery.deliver(text, ParseMode::MarkdownV2).await {
            Ok(()) => Ok(()),
            Err(err) => {
                debug!("formatted send rejected ({}); retrying without markup", err);
                self.delivery.deliver(text, ParseMode::Plain).await
            }
        }
    }
}
