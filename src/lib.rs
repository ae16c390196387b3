pub mod aggregator;
pub mod config;
pub mod cycle;
pub mod deliver;
pub mod retry;
pub mod sanitizer;
pub mod scheduler;
pub mod store;
pub mod summarizer;
pub mod tracker;
pub mod types;

pub use aggregator::{FeedAggregator, FetchSource, HttpSourceFetcher};
pub use config::Config;
pub use cycle::{CycleOrchestrator, CycleReport};
pub use deliver::{DeliverMessage, ParseMode, TelegramSender};
pub use sanitizer::sanitize;
pub use store::NewsStore;
pub use summarizer::{ProxySummarizer, Summarize};
pub use tracker::PublicationTracker;
pub use types::*;
