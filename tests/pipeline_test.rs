mod common;

use async_trait::async_trait;
use common::{memory_store, raw_item};
use news_relay::{
    CycleConfig, CycleOrchestrator, DeliverMessage, FeedAggregator, FetchSource, ParseMode,
    PipelineError, RawItem, Result, SourceConfig, Summarize,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const FEED_A: &str = "https://feeds.example.com/games.xml";
const FEED_B: &str = "https://feeds.example.com/industry.xml";

/// Serves canned items per source URL; unknown sources fail like a
/// network timeout would.
struct StubFetcher {
    responses: HashMap<String, Vec<RawItem>>,
}

#[async_trait]
impl FetchSource for StubFetcher {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<RawItem>> {
        match self.responses.get(&source.url) {
            Some(items) => Ok(items.clone()),
            None => Err(PipelineError::SourceFetch(format!(
                "timed out fetching {}",
                source.url
            ))),
        }
    }
}

struct StubSummarizer {
    reply: String,
    calls: AtomicUsize,
}

impl StubSummarizer {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Summarize for StubSummarizer {
    async fn summarize(&self, _url: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

/// Records every send; can be told to reject the formatted path.
struct RecordingDelivery {
    sent: Mutex<Vec<(String, ParseMode)>>,
    reject_markdown: bool,
}

impl RecordingDelivery {
    fn new(reject_markdown: bool) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject_markdown,
        }
    }

    fn log(&self) -> Vec<(String, ParseMode)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliverMessage for RecordingDelivery {
    async fn deliver(&self, text: &str, mode: ParseMode) -> Result<()> {
        self.sent.lock().unwrap().push((text.to_string(), mode));
        if self.reject_markdown && mode == ParseMode::MarkdownV2 {
            return Err(PipelineError::Delivery(
                "can't parse entities in message text".to_string(),
            ));
        }
        Ok(())
    }
}

fn fast_cycle_config() -> CycleConfig {
    CycleConfig {
        max_attempts: 3,
        retry_delay: Duration::ZERO,
        send_delay: Duration::ZERO,
        min_summary_chars: 50,
    }
}

fn sources() -> Vec<SourceConfig> {
    vec![SourceConfig::from_url(FEED_A), SourceConfig::from_url(FEED_B)]
}

const GOOD_SUMMARY: &str = "Valve shipped a surprise update for Team Fortress 2 today, \
fixing over a hundred long-standing bugs and adding a new anti-cheat layer. The servers \
filled up within hours and the community is celebrating the end of a very long silence.";

const SHORT_SUMMARY: &str = "Short update without details to publish";

#[tokio::test]
async fn failing_source_does_not_abort_its_siblings() {
    let fetcher = Arc::new(StubFetcher {
        responses: HashMap::from([(
            FEED_A.to_string(),
            vec![
                raw_item("https://example.com/x", "T1", FEED_A, None),
                raw_item("https://example.com/y", "T2", FEED_A, None),
            ],
        )]),
    });

    let aggregator = FeedAggregator::new(fetcher, sources());
    let items = aggregator.fetch_all().await;

    let urls: Vec<&str> = items.iter().map(|i| i.link.as_str()).collect();
    assert_eq!(urls, vec!["https://example.com/x", "https://example.com/y"]);
}

#[tokio::test]
async fn below_floor_summaries_exhaust_the_budget_and_leave_the_item_unsent() {
    let (store, tracker) = memory_store().await;

    // Feed A yields one item, feed B times out.
    let fetcher = Arc::new(StubFetcher {
        responses: HashMap::from([(
            FEED_A.to_string(),
            vec![raw_item("https://example.com/x", "T1", FEED_A, None)],
        )]),
    });

    let summarizer = Arc::new(StubSummarizer::new(SHORT_SUMMARY));
    let delivery = Arc::new(RecordingDelivery::new(false));

    let orchestrator = CycleOrchestrator::new(
        FeedAggregator::new(fetcher, sources()),
        store,
        tracker,
        summarizer.clone(),
        delivery.clone(),
        fast_cycle_config(),
    );

    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.fetched, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.pending, 1);
    assert_eq!(report.delivered, 0);
    assert_eq!(report.failed, 1);

    // Three attempts, no send, no delivery record.
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 3);
    assert!(delivery.log().is_empty());

    // The item re-enters the candidate set on the next cycle.
    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.pending, 1);
    assert_eq!(report.delivered, 0);
}

#[tokio::test]
async fn a_good_summary_is_delivered_once_and_marked_sent() {
    let (store, tracker) = memory_store().await;

    let fetcher = Arc::new(StubFetcher {
        responses: HashMap::from([(
            FEED_A.to_string(),
            vec![raw_item("https://example.com/x", "T1", FEED_A, None)],
        )]),
    });

    let summarizer = Arc::new(StubSummarizer::new(GOOD_SUMMARY));
    let delivery = Arc::new(RecordingDelivery::new(false));

    let orchestrator = CycleOrchestrator::new(
        FeedAggregator::new(fetcher, sources()),
        store,
        tracker,
        summarizer.clone(),
        delivery.clone(),
        fast_cycle_config(),
    );

    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 0);

    let log = delivery.log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].1, ParseMode::MarkdownV2);
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);

    // The second cycle finds nothing left to deliver.
    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.pending, 0);
    assert_eq!(report.delivered, 0);
    assert_eq!(delivery.log().len(), 1);
}

#[tokio::test]
async fn rejected_markup_falls_back_to_a_plain_send() {
    let (store, tracker) = memory_store().await;

    let fetcher = Arc::new(StubFetcher {
        responses: HashMap::from([(
            FEED_A.to_string(),
            vec![raw_item("https://example.com/x", "T1", FEED_A, None)],
        )]),
    });

    let delivery = Arc::new(RecordingDelivery::new(true));

    let orchestrator = CycleOrchestrator::new(
        FeedAggregator::new(fetcher, sources()),
        store,
        tracker,
        Arc::new(StubSummarizer::new(GOOD_SUMMARY)),
        delivery.clone(),
        fast_cycle_config(),
    );

    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.delivered, 1);

    let modes: Vec<ParseMode> = delivery.log().iter().map(|(_, mode)| *mode).collect();
    assert_eq!(modes, vec![ParseMode::MarkdownV2, ParseMode::Plain]);
}

#[tokio::test]
async fn an_empty_cycle_is_a_no_op_success() {
    let (store, tracker) = memory_store().await;

    let fetcher = Arc::new(StubFetcher {
        responses: HashMap::from([(FEED_A.to_string(), Vec::new())]),
    });

    let orchestrator = CycleOrchestrator::new(
        FeedAggregator::new(fetcher, vec![SourceConfig::from_url(FEED_A)]),
        store,
        tracker,
        Arc::new(StubSummarizer::new(GOOD_SUMMARY)),
        Arc::new(RecordingDelivery::new(false)),
        fast_cycle_config(),
    );

    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.fetched, 0);
    assert_eq!(report.pending, 0);
    assert_eq!(report.delivered, 0);
    assert_eq!(report.failed, 0);
}
