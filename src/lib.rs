//! Kindred - AI companion core
//!
//! Digital twin profiles, mood tracking, and authenticated chat for
//! companion apps: an HTTP pipeline with bounded recovery, a hosted
//! backend client, a realtime message bus, and a language-model wrapper
//! with an offline fallback.

pub mod api;
pub mod auth;
pub mod backend;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod realtime;
pub mod storage;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{ApiError, KindredError, Result};
pub use store::TwinStore;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
