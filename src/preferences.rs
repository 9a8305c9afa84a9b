//! Typed preference store over the `user_preferences` table.
//!
//! Holds the base URL and API token (scalars, cached in memory and observable)
//! and the feed display order (a JSON object read from storage on demand).
//! An absent scalar is the empty string; callers treat empty as "not configured".
use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use futures::Stream;
use tokio::sync::watch;

use crate::config::Config;
use crate::storage::Database;

pub const BASE_URL_KEY: &str = "base_url";
pub const API_TOKEN_KEY: &str = "api_token";
pub const FEED_ORDER_KEY: &str = "feed_order";

/// Feed id → order index. Serialized as a JSON object with string keys.
pub type FeedOrderMap = BTreeMap<i64, i64>;

// ============================================================================
// PreferenceStore
// ============================================================================

/// Persistent settings with read-once and subscribe-to-changes accessors.
///
/// Scalars are loaded once at construction; reads are in-memory. Writes
/// persist to the DB first and then notify subscribers, so a subscriber never
/// observes a value that failed to persist.
#[derive(Clone)]
pub struct PreferenceStore {
    db: Database,
    base_url: Arc<watch::Sender<String>>,
    api_token: Arc<watch::Sender<String>>,
}

impl PreferenceStore {
    /// Load the scalar preferences from the database.
    pub async fn load(db: Database) -> Result<Self> {
        let base_url = db.get_preference(BASE_URL_KEY).await?.unwrap_or_default();
        let api_token = db.get_preference(API_TOKEN_KEY).await?.unwrap_or_default();

        tracing::debug!(
            base_url_set = !base_url.is_empty(),
            api_token_set = !api_token.is_empty(),
            "Loaded preferences"
        );

        Ok(Self {
            db,
            base_url: Arc::new(watch::Sender::new(base_url)),
            api_token: Arc::new(watch::Sender::new(api_token)),
        })
    }

    // ========================================================================
    // Scalars
    // ========================================================================

    /// Current base URL, or `""` when not configured.
    pub fn base_url(&self) -> String {
        self.base_url.borrow().clone()
    }

    /// Emits the current base URL immediately, then again after every write.
    pub fn base_url_stream(&self) -> impl Stream<Item = String> {
        watch_stream(self.base_url.subscribe())
    }

    pub async fn set_base_url(&self, url: &str) -> Result<()> {
        self.db.set_preference(BASE_URL_KEY, url).await?;
        self.base_url.send_replace(url.to_string());
        Ok(())
    }

    /// Current API token, or `""` when not configured.
    pub fn api_token(&self) -> String {
        self.api_token.borrow().clone()
    }

    /// Emits the current API token immediately, then again after every write.
    pub fn api_token_stream(&self) -> impl Stream<Item = String> {
        watch_stream(self.api_token.subscribe())
    }

    /// The in-memory token changes even if the write fails, so a fresh login
    /// still works for the rest of the session.
    pub async fn set_api_token(&self, token: &str) -> Result<()> {
        self.api_token.send_replace(token.to_string());
        self.db.set_preference(API_TOKEN_KEY, token).await
    }

    /// Stored base URL, falling back to the config file value when unset.
    pub fn resolved_base_url(&self, config: &Config) -> Option<String> {
        let stored = self.base_url();
        if !stored.is_empty() {
            return Some(stored);
        }
        config.base_url.clone().filter(|url| !url.is_empty())
    }

    // ========================================================================
    // Feed Order
    // ========================================================================

    /// The stored feed order.
    ///
    /// Missing or malformed JSON yields an empty map; a malformed value is
    /// logged and otherwise discarded.
    pub async fn feed_order(&self) -> Result<FeedOrderMap> {
        let Some(raw) = self.db.get_preference(FEED_ORDER_KEY).await? else {
            return Ok(FeedOrderMap::new());
        };

        match serde_json::from_str::<FeedOrderMap>(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!(error = %e, "Stored feed order is not valid JSON, using empty order");
                Ok(FeedOrderMap::new())
            }
        }
    }

    pub async fn set_feed_order(&self, order: &FeedOrderMap) -> Result<()> {
        let json = serde_json::to_string(order)?;
        self.db.set_preference(FEED_ORDER_KEY, &json).await
    }

    // ========================================================================
    // Reset
    // ========================================================================

    /// Remove every stored key and reset the scalars to empty.
    pub async fn clear_all(&self) -> Result<()> {
        let removed = self.db.clear_preferences().await?;
        self.base_url.send_replace(String::new());
        self.api_token.send_replace(String::new());
        tracing::info!(removed = removed, "Cleared all preferences");
        Ok(())
    }
}

/// Yield the receiver's current value, then one item per change notification.
/// Ends when the sender is dropped.
fn watch_stream(rx: watch::Receiver<String>) -> impl Stream<Item = String> {
    futures::stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let value = rx.borrow_and_update().clone();
        Some((value, (rx, false)))
    })
}

// ============================================================================
// Tests
// ============================================================================
