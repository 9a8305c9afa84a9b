use anyhow::Result;
use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::FeedOrder;

impl Database {
    // ========================================================================
    // Feed Order Operations
    // ========================================================================

    /// All stored feed orders, ascending by `order_index`.
    ///
    /// Ties keep SQLite's iteration order; callers must not rely on it.
    pub async fn get_all_feed_orders(&self) -> Result<Vec<FeedOrder>> {
        let rows: Vec<FeedOrder> =
            sqlx::query_as("SELECT feed_id, order_index FROM feed_order ORDER BY order_index ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    /// Upsert a single feed order.
    pub async fn insert_feed_order(&self, order: FeedOrder) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO feed_order (feed_id, order_index) VALUES (?, ?)
            ON CONFLICT(feed_id) DO UPDATE SET order_index = excluded.order_index
        "#,
        )
        .bind(order.feed_id)
        .bind(order.order_index)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert many feed orders in one transaction.
    pub async fn insert_all_feed_orders(&self, orders: &[FeedOrder]) -> Result<()> {
        if orders.is_empty() {
            return Ok(());
        }

        const BATCH_SIZE: usize = 200;
        let mut tx = self.pool.begin().await?;

        for chunk in orders.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> =
                QueryBuilder::new("INSERT INTO feed_order (feed_id, order_index) ");
            builder.push_values(chunk, |mut b, order| {
                b.push_bind(order.feed_id).push_bind(order.order_index);
            });
            builder.push(" ON CONFLICT(feed_id) DO UPDATE SET order_index = excluded.order_index");
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Remove the order for one feed. Unknown ids are ignored.
    pub async fn delete_feed_order(&self, feed_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM feed_order WHERE feed_id = ?")
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_all_feed_orders(&self) -> Result<()> {
        sqlx::query("DELETE FROM feed_order")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
