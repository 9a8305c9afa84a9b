use anyhow::Result;
use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{Entry, EntryDbRow};

impl Database {
    // ========================================================================
    // Entry Cache Operations
    // ========================================================================

    /// Bulk upsert entries keyed by id.
    ///
    /// A row with an existing id is fully replaced. Batches of 100 keep the
    /// statement at 500 parameters, under SQLite's 999 limit.
    pub async fn insert_all(&self, entries: &[Entry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        const BATCH_SIZE: usize = 100;
        let mut tx = self.pool.begin().await?;

        for chunk in entries.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT INTO entries (id, title, url, content, published_at) ",
            );

            builder.push_values(chunk, |mut b, entry| {
                b.push_bind(entry.id)
                    .push_bind(&entry.title)
                    .push_bind(&entry.url)
                    .push_bind(&entry.content)
                    .push_bind(&entry.published_at);
            });

            builder.push(
                " ON CONFLICT(id) DO UPDATE SET \
                 title = excluded.title, \
                 url = excluded.url, \
                 content = excluded.content, \
                 published_at = excluded.published_at",
            );

            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        tracing::debug!(count = entries.len(), "Cached entries");
        Ok(())
    }

    /// Every cached entry, in storage order.
    pub async fn get_all_entries(&self) -> Result<Vec<Entry>> {
        let rows: Vec<EntryDbRow> =
            sqlx::query_as("SELECT id, title, url, content, published_at FROM entries")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(EntryDbRow::into_entry).collect())
    }
}
