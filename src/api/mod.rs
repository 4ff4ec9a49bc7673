//! Authenticated HTTP request pipeline
//!
//! Wraps outbound calls with bearer-token injection, failure
//! classification, bounded retry with exponential backoff, and a one-time
//! token refresh on authorization failure.

mod client;

pub use client::{ApiClient, DEFAULT_MAX_RETRIES, REQUEST_TIMEOUT};
