//! Utility functions for the compliance backend
//!
//! Provides environment variable handling, audit helpers, and timestamps.

pub mod audit;
pub mod env;

pub use audit::record_audit_event;
pub use env::{load_env, env_or, env_parse_or, AppConfig};

use chrono::{SecondsFormat, Utc};

/// Current time as a fixed-width RFC 3339 string (microseconds, `Z` suffix)
///
/// Fixed width keeps stored timestamps lexicographically ordered.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
