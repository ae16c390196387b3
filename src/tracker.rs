use crate::types::{NewsItem, PipelineError, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

/// Durable "sent" ledger. One row per delivered item, enforced by a
/// uniqueness constraint, makes delivery idempotent across restarts.
pub struct PublicationTracker {
    pool: SqlitePool,
}

impl PublicationTracker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Items with no delivery record, in insertion order.
    pub async fn unsent_items(&self) -> Result<Vec<NewsItem>> {
        let items = sqlx::query_as::<_, NewsItem>(
            r#"
            SELECT n.id, n.title, n.url, n.source_id, n.published_at
            FROM news n
            LEFT JOIN sent_news s ON s.news_id = n.id
            WHERE s.id IS NULL
            ORDER BY n.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Records a successful delivery. A second record for the same item is
    /// rejected by the schema and surfaces as `AlreadyDelivered`; this is
    /// the idempotency enforcement point.
    pub async fn mark_sent(&self, news_id: i64) -> Result<()> {
        let sent_at = Utc::now();

        sqlx::query("INSERT INTO sent_news (user_id, news_id, sent_at) VALUES (NULL, ?1, ?2)")
            .bind(news_id)
            .bind(sent_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    PipelineError::AlreadyDelivered(news_id)
                }
                _ => PipelineError::Database(e),
            })?;

        debug!("marked item {} as sent", news_id);
        Ok(())
    }
}
