use chrono::{DateTime, NaiveDate};

use crate::preferences::FeedOrderMap;
use crate::storage::Entry;

/// Calendar date of `published_at`.
///
/// RFC 3339 timestamps use the date in their own offset; anything else is read
/// from a leading `YYYY-MM-DD`.
pub fn publication_date(published_at: &str) -> Option<NaiveDate> {
    let raw = published_at.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

pub fn published_on(entry: &Entry, date: NaiveDate) -> bool {
    publication_date(&entry.published_at) == Some(date)
}

pub fn in_category(entry: &Entry, category_id: i64) -> bool {
    entry.category_id() == Some(category_id)
}

/// Reorder feeds by an explicit feed order.
///
/// Feeds present in `order` come first, ascending by index; ties and all
/// remaining feeds keep their incoming (server) order.
pub fn apply_feed_order(mut feeds: Vec<Entry>, order: &FeedOrderMap) -> Vec<Entry> {
    if order.is_empty() {
        return feeds;
    }
    // Stable sort: unordered feeds share one key and keep their relative order
    feeds.sort_by_key(|feed| match order.get(&feed.id) {
        Some(index) => (0, *index),
        None => (1, 0),
    });
    feeds
}
