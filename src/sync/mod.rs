//! Sync/state layer: fetches from the API client and publishes results into
//! observable state.
//!
//! Every fetch operation publishes its [`FetchOutcome`] into the matching
//! [`Observable`] and also returns it. Failures never escape as errors; they
//! become `FetchOutcome::Failure(kind)`.
//!
//! `SyncState` is cheap to clone, so callers can fire-and-forget:
//!
//! ```ignore
//! let state = state.clone();
//! tokio::spawn(async move { state.fetch_feeds(None).await });
//! ```

mod filter;
mod observable;

pub use filter::{apply_feed_order, publication_date};
pub use observable::{FetchOutcome, Observable};

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};

use crate::api::{FailureKind, MinifluxClient};
use crate::preferences::PreferenceStore;
use crate::storage::{Category, Entry};

struct Inner {
    api: MinifluxClient,
    prefs: PreferenceStore,
    feeds: Observable<Vec<Entry>>,
    entries: Observable<Vec<Entry>>,
    categories: Observable<Vec<Category>>,
    category_feeds: Observable<Vec<Entry>>,
    selected_entry: Observable<Entry>,
}

/// In-memory feeds, entries and categories backed by the Miniflux API.
#[derive(Clone)]
pub struct SyncState {
    inner: Arc<Inner>,
}

impl SyncState {
    /// The token is always read from `prefs`, so writes and `clear_all` made
    /// through the store apply to the next fetch.
    pub fn new(api: MinifluxClient, prefs: PreferenceStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                prefs,
                feeds: Observable::new(),
                entries: Observable::new(),
                categories: Observable::new(),
                category_feeds: Observable::new(),
                selected_entry: Observable::new(),
            }),
        }
    }

    // ========================================================================
    // Observable State
    // ========================================================================

    pub fn feeds(&self) -> &Observable<Vec<Entry>> {
        &self.inner.feeds
    }

    pub fn entries(&self) -> &Observable<Vec<Entry>> {
        &self.inner.entries
    }

    pub fn categories(&self) -> &Observable<Vec<Category>> {
        &self.inner.categories
    }

    /// Feeds of the most recently selected category.
    pub fn category_feeds(&self) -> &Observable<Vec<Entry>> {
        &self.inner.category_feeds
    }

    pub fn selected_entry(&self) -> &Observable<Entry> {
        &self.inner.selected_entry
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Store the token and persist it for later launches.
    ///
    /// The store's in-memory value is updated even if persisting fails.
    pub async fn set_auth_token(&self, token: &str) -> Result<()> {
        self.inner.prefs.set_api_token(token).await
    }

    /// Authenticate and keep the returned token.
    pub async fn login(&self, username: &str, password: &SecretString) -> FetchOutcome<()> {
        let response = match self.inner.api.login(username, password).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, username = %username, "Login failed");
                return FetchOutcome::Failure(e.kind());
            }
        };

        if let Err(e) = self.set_auth_token(response.token.expose_secret()).await {
            tracing::error!(error = %e, "Failed to persist API token; it is kept for this session only");
        }
        FetchOutcome::Success(())
    }

    /// Explicit non-empty token first, then the stored one.
    fn current_token(&self, explicit: Option<&str>) -> Option<SecretString> {
        if let Some(token) = explicit.filter(|t| !t.is_empty()) {
            return Some(SecretString::from(token.to_owned()));
        }
        let token = self.inner.prefs.api_token();
        (!token.is_empty()).then(|| SecretString::from(token))
    }

    // ========================================================================
    // Fetch Operations
    // ========================================================================

    /// Replace `feeds` with the server's list, in server order.
    pub async fn fetch_feeds(&self, token: Option<&str>) -> FetchOutcome<Vec<Entry>> {
        let slot = &self.inner.feeds;
        let generation = slot.begin();
        let outcome = into_outcome(self.load_feeds(token).await);
        slot.publish(generation, outcome.clone());
        outcome
    }

    /// Replace `entries` with the feeds belonging to `category_id`.
    pub async fn fetch_entries(&self, category_id: i64) -> FetchOutcome<Vec<Entry>> {
        let slot = &self.inner.entries;
        let generation = slot.begin();
        let result = self
            .load_feeds(None)
            .await
            .map(|feeds| keep(feeds, |e| filter::in_category(e, category_id)));
        let outcome = into_outcome(result);
        slot.publish(generation, outcome.clone());
        outcome
    }

    /// Replace `category_feeds` with the feeds belonging to `category_id`.
    pub async fn fetch_category_feeds(&self, category_id: i64) -> FetchOutcome<Vec<Entry>> {
        let slot = &self.inner.category_feeds;
        let generation = slot.begin();
        let result = self
            .load_feeds(None)
            .await
            .map(|feeds| keep(feeds, |e| filter::in_category(e, category_id)));
        let outcome = into_outcome(result);
        slot.publish(generation, outcome.clone());
        outcome
    }

    /// Replace `entries` with everything published on the current local date.
    pub async fn fetch_today_entries(&self) -> FetchOutcome<Vec<Entry>> {
        let today = chrono::Local::now().date_naive();
        self.fetch_entries_published_on(today).await
    }

    /// Replace `entries` with everything published on `date`.
    pub async fn fetch_entries_published_on(&self, date: NaiveDate) -> FetchOutcome<Vec<Entry>> {
        let slot = &self.inner.entries;
        let generation = slot.begin();
        let result = self
            .load_feeds(None)
            .await
            .map(|feeds| keep(feeds, |e| filter::published_on(e, date)));
        let outcome = into_outcome(result);
        slot.publish(generation, outcome.clone());
        outcome
    }

    /// Select an entry by id.
    ///
    /// Scans the in-memory `entries` first. On a miss, fetches the full list
    /// and scans that; `entries` itself is left as it was.
    pub async fn load_entry_by_id(&self, id: i64) -> FetchOutcome<Entry> {
        let slot = &self.inner.selected_entry;
        let generation = slot.begin();

        let cached = self
            .inner
            .entries
            .get()
            .items()
            .iter()
            .find(|e| e.id == id)
            .cloned();

        let outcome = match cached {
            Some(entry) => FetchOutcome::Success(entry),
            None => match self.load_feeds(None).await {
                Err(kind) => FetchOutcome::Failure(kind),
                Ok(feeds) => match feeds.into_iter().find(|e| e.id == id) {
                    Some(entry) => FetchOutcome::Success(entry),
                    None => {
                        tracing::debug!(entry_id = id, "Entry not found");
                        FetchOutcome::Empty
                    }
                },
            },
        };

        slot.publish(generation, outcome.clone());
        outcome
    }

    /// Replace `categories` with the server's list.
    pub async fn fetch_categories(&self) -> FetchOutcome<Vec<Category>> {
        let slot = &self.inner.categories;
        let generation = slot.begin();

        let result = match self.current_token(None) {
            None => Err(FailureKind::NotConfigured),
            Some(token) => self.inner.api.get_categories(&token).await.map_err(|e| {
                tracing::warn!(error = %e, "Category fetch failed");
                e.kind()
            }),
        };

        let outcome = into_outcome(result);
        slot.publish(generation, outcome.clone());
        outcome
    }

    async fn load_feeds(&self, token: Option<&str>) -> Result<Vec<Entry>, FailureKind> {
        let Some(token) = self.current_token(token) else {
            tracing::debug!("No API token configured");
            return Err(FailureKind::NotConfigured);
        };
        self.inner.api.get_feeds(&token).await.map_err(|e| {
            tracing::warn!(error = %e, "Feed fetch failed");
            e.kind()
        })
    }
}

fn keep(feeds: Vec<Entry>, predicate: impl Fn(&Entry) -> bool) -> Vec<Entry> {
    feeds.into_iter().filter(|e| predicate(e)).collect()
}

fn into_outcome<T>(result: Result<Vec<T>, FailureKind>) -> FetchOutcome<Vec<T>> {
    match result {
        Ok(items) => FetchOutcome::from_list(items),
        Err(kind) => FetchOutcome::Failure(kind),
    }
}
