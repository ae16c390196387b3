use chrono::{DateTime, Utc};
use news_relay::{NewsStore, PublicationTracker, RawItem};
use sqlx::sqlite::SqlitePoolOptions;

/// Store and tracker backed by one in-memory SQLite connection with the
/// schema applied.
pub async fn memory_store() -> (NewsStore, PublicationTracker) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");

    let store = NewsStore::new(pool.clone());
    store.migrate().await.expect("migrations");

    (store, PublicationTracker::new(pool))
}

pub fn raw_item(
    url: &str,
    title: &str,
    source_url: &str,
    published: Option<DateTime<Utc>>,
) -> RawItem {
    RawItem {
        title: title.to_string(),
        link: url.to_string(),
        published,
        source_url: source_url.to_string(),
    }
}
