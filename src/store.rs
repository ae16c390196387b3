use crate::types::{RawItem, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::{debug, info};

/// The ingestion store: canonical news items keyed by unique URL.
pub struct NewsStore {
    pool: SqlitePool,
}

impl NewsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (and if necessary creates) the database behind `database_url`.
    pub async fn connect(database_url: &str) -> Result<SqlitePool> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(pool)
    }

    /// Runs the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }

    /// Inserts the items that are not yet known, resolving or lazily
    /// creating their feed sources. The whole batch commits as a single
    /// transaction; a mid-batch failure rolls everything back. Items whose
    /// URL already exists are skipped silently. Returns the inserted count.
    pub async fn sync_new(&self, items: &[RawItem]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for item in items {
            let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM news WHERE url = ?1")
                .bind(&item.link)
                .fetch_optional(&mut *tx)
                .await?;

            if existing.is_some() {
                debug!("already known, skipping {}", item.link);
                continue;
            }

            let source_id = resolve_source(&mut tx, &item.source_url).await?;
            // A missing or unparseable feed date never fails the insert.
            let published_at = item.published.unwrap_or_else(Utc::now);

            sqlx::query("INSERT INTO news (title, url, source_id, published_at) VALUES (?1, ?2, ?3, ?4)")
                .bind(&item.title)
                .bind(&item.link)
                .bind(source_id)
                .bind(published_at)
                .execute(&mut *tx)
                .await?;

            inserted += 1;
        }

        tx.commit().await?;
        info!("ingested {} new items", inserted);
        Ok(inserted)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn resolve_source(tx: &mut Transaction<'_, Sqlite>, source_url: &str) -> Result<i64> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM feeds WHERE url = ?1")
        .bind(source_url)
        .fetch_optional(&mut **tx)
        .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let name = url::Url::parse(source_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| source_url.to_string());

    let result = sqlx::query("INSERT INTO feeds (name, url, kind) VALUES (?1, ?2, 'rss')")
        .bind(&name)
        .bind(source_url)
        .execute(&mut **tx)
        .await?;

    debug!("registered new feed source {}", source_url);
    Ok(result.last_insert_rowid())
}
