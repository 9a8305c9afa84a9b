//! Local persistence on SQLite.
//!
//! - `entries` and `feed_order` tables: the local entry cache
//! - `user_preferences` table: raw key-value rows behind
//!   [`PreferenceStore`](crate::preferences::PreferenceStore)

mod entries;
mod feed_order;
mod preferences;
mod schema;
mod types;

pub use schema::Database;
pub use types::{Category, DatabaseError, Entry, FeedOrder};
