//! Utility functions

pub mod logger;
pub mod scrub;

pub use logger::{init_logging, Logger};
pub use scrub::scrub_message;
