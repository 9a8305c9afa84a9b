//! # fluxreader
//!
//! A client for the Miniflux feed-aggregation API with a small local state
//! layer.
//!
//! ```text
//! CLI / UI → SyncState → MinifluxClient → Miniflux server
//!               │
//!               └─ PreferenceStore ─┐
//!                  entry cache ─────┴─ Database (SQLite)
//! ```
//!
//! Everything is constructed explicitly at startup and passed down; there
//! are no global singletons.

/// Miniflux REST client and its error taxonomy.
pub mod api;

/// Optional TOML configuration file.
pub mod config;

/// Base URL, API token and feed order, persisted and observable.
pub mod preferences;

/// Plain-text rendering used by the command-line driver.
pub mod render;

/// SQLite persistence: entry cache, feed order table, raw preferences.
pub mod storage;

/// Observable feeds/entries/categories and the fetch operations that fill them.
pub mod sync;
