//! Miniflux REST API client.
//!
//! - [`MinifluxClient`]: login, feed and category listing over `reqwest`
//! - [`ApiError`]: per-call failures, each mapping to a [`FailureKind`]

mod client;
mod error;

pub use client::{LoginResponse, MinifluxClient};
pub use error::{ApiError, FailureKind};
