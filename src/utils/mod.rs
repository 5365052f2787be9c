//! Utility modules supporting search operations.
//!
//! - [`HttpClient`]: shared HTTP client; retries and status handling included
//! - [`with_retry`]: repeat an operation on transient errors
//! - [`normalize_text`], [`strip_markup`], [`normalize_identifier`]: text cleanup
//! - [`HistoryStore`]: persisted list of committed queries
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use bibhunt::utils::{with_retry, RetryPolicy};
//! use bibhunt::sources::SourceError;
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let policy = RetryPolicy::interactive().attempts(3);
//! let result = with_retry(policy, || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod history;
mod http;
mod retry;
mod text;

pub use history::{HistoryEntry, HistoryEntryKind, HistoryStore};
pub use http::HttpClient;
pub use retry::{with_retry, RetryPolicy};
pub(crate) use text::cached_regex;
pub use text::{normalize_identifier, normalize_text, strip_markup};
