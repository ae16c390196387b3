use anyhow::Context;
use clap::Parser;
use news_relay::{
    scheduler, Config, CycleConfig, CycleOrchestrator, FeedAggregator, FetchConfig,
    HttpSourceFetcher, NewsStore, ProxySummarizer, PublicationTracker, TelegramSender,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Periodic feed harvester that summarizes fresh items through an LLM
/// proxy and posts them to a Telegram channel.
#[derive(Parser)]
#[command(name = "news-relay", version)]
struct Cli {
    /// Run a single sync-and-deliver cycle, then exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    let pool = NewsStore::connect(&config.database_url)
        .await
        .context("failed to open the database")?;
    let store = NewsStore::new(pool.clone());
    store.migrate().await.context("failed to run migrations")?;

    let tracker = PublicationTracker::new(pool);
    let fetcher = Arc::new(HttpSourceFetcher::new(FetchConfig::default()));
    let aggregator = FeedAggregator::new(fetcher, config.sources());
    let summarizer = Arc::new(ProxySummarizer::new(config.summarizer_base_url.clone()));
    let delivery = Arc::new(TelegramSender::new(
        config.bot_token.clone(),
        config.chat_id,
        config.thread_id,
    ));

    let orchestrator = CycleOrchestrator::new(
        aggregator,
        store,
        tracker,
        summarizer,
        delivery,
        CycleConfig::default(),
    );

    info!(
        "watching {} feeds for chat {}",
        config.feed_urls.len(),
        config.chat_id
    );

    if cli.once {
        let report = orchestrator.run_cycle().await?;
        info!(
            "single cycle finished: {} delivered, {} failed",
            report.delivered, report.failed
        );
        return Ok(());
    }

    scheduler::run(&orchestrator, config.cycle_interval).await;
    Ok(())
}
