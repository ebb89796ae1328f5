//! Askerbot Core
//!
//! Shared building blocks for the Askerbot FAQ assistant:
//!
//! - Error type and `Result` alias used across the workspace
//! - Environment-driven configuration (`ChatConfig`)
//! - Time-bounded caches with an injectable clock
//! - The `CompletionProvider` seam for the hosted language model
//! - Deadline and cancellation helpers for outbound calls
//! - Logging initialization
//!
//! # Example
//!
//! ```no_run
//! use askerbot_core::{ChatConfig, TtlCache, SystemClock};
//! use std::sync::Arc;
//!
//! let config = ChatConfig::from_env();
//! let cache: TtlCache<String> = TtlCache::new(
//!     "responses",
//!     config.response_cache_ttl,
//!     config.response_cache_max,
//!     Arc::new(SystemClock),
//! );
//! assert!(cache.get("hei").is_none());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod error;
pub mod provider;
pub mod resilience;
pub mod types;
pub mod utils;

pub use cache::{CacheStats, Clock, ManualClock, SystemClock, TtlCache};
pub use config::{
    get_env_bool, get_env_float, get_env_int, get_env_or, get_required_env, load_env,
    ChatConfig,
};
pub use error::{AskerError, Result};
pub use provider::CompletionProvider;
pub use resilience::with_deadline;
pub use types::{CompletionPurpose, CompletionRequest, CompletionResponse, Source, Usage};

/// Cancellation token re-exported so downstream crates share one type
pub use tokio_util::sync::CancellationToken;
