//! Search backends behind a common trait.
//!
//! This module defines the [`Source`] trait that every backend implements.
//! The aggregator treats all sources identically through it: a source takes
//! a title and returns its own ranked list of [`SearchResult`]s, or fails.
//!
//! # Feature Flags
//!
//! Individual backends can be disabled at compile time using Cargo features:
//!
//! - `source-openalex` - Enable OpenAlex (default: enabled)
//! - `source-crossref` - Enable CrossRef (default: enabled)
//! - `source-semantic` - Enable Semantic Scholar (default: enabled)
//!
//! # Runtime Source Configuration
//!
//! Which compiled-in sources are queried, and in which order, comes from
//! `search.sources` in the configuration file (or `BIBHUNT_SEARCH__SOURCES`).
//! Unknown identifiers are skipped with a warning.

#[cfg(feature = "source-crossref")]
mod crossref;
#[cfg(feature = "source-openalex")]
mod openalex;
mod registry;
#[cfg(feature = "source-semantic")]
mod semantic;

pub mod mock;

pub use mock::MockSource;

#[cfg(feature = "source-crossref")]
pub use crossref::CrossRefSource;
#[cfg(feature = "source-openalex")]
pub use openalex::OpenAlexSource;
pub use registry::{SourceCapabilities, SourceRegistry};
#[cfg(feature = "source-semantic")]
pub use semantic::SemanticScholarSource;

use crate::models::SearchResult;
use async_trait::async_trait;
use reqwest::StatusCode;

/// The Source trait defines the interface for all search backends.
///
/// # Implementing a New Source
///
/// 1. Create a new struct that implements `Source`
/// 2. Implement `id`, `name` and `search`
/// 3. Register it in `SourceRegistry::new()` or with `register`
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier, as used in `search.sources`
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Describe the capabilities of this source
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH
    }

    /// Whether this source supports title search
    fn supports_search(&self) -> bool {
        self.capabilities().contains(SourceCapabilities::SEARCH)
    }

    /// Whether results from this source usually carry an abstract
    fn provides_abstracts(&self) -> bool {
        self.capabilities().contains(SourceCapabilities::ABSTRACTS)
    }

    /// Search for records whose title matches `title`.
    ///
    /// Returns at most `max_results` records in the backend's ranking order.
    /// An empty list is a valid answer, not an error.
    async fn search(&self, _title: &str, _max_results: usize) -> Result<Vec<SearchResult>, SourceError> {
        Err(SourceError::NotImplemented)
    }
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The requested operation is not implemented for this source
    #[error("Operation not implemented for this source")]
    NotImplemented,

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (malformed JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Request did not finish in time
    #[error("Timed out")]
    Timeout,

    /// The backend answered with a non-success status
    #[error("{backend} returned HTTP {status}")]
    Status {
        backend: &'static str,
        status: StatusCode,
    },

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl SourceError {
    /// Error for a non-success response from `backend`
    pub fn from_status(backend: &'static str, status: StatusCode) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            SourceError::RateLimit
        } else {
            SourceError::Status { backend, status }
        }
    }

    /// Whether repeating the request may succeed.
    ///
    /// Rate limiting is not transient here: its window is far longer than
    /// the per-source deadline.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Network(_) | SourceError::Timeout => true,
            SourceError::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_capabilities() {
        let caps = SourceCapabilities::SEARCH | SourceCapabilities::ABSTRACTS;

        assert!(caps.contains(SourceCapabilities::SEARCH));
        assert!(caps.contains(SourceCapabilities::ABSTRACTS));
        assert!(!caps.contains(SourceCapabilities::API_KEY));
    }

    #[test]
    fn test_json_error_maps_to_parse() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(SourceError::from(err), SourceError::Parse(_)));
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            SourceError::from_status("OpenAlex", StatusCode::TOO_MANY_REQUESTS),
            SourceError::RateLimit
        ));
        assert!(SourceError::from_status("OpenAlex", StatusCode::BAD_GATEWAY).is_transient());
        assert!(!SourceError::from_status("OpenAlex", StatusCode::BAD_REQUEST).is_transient());
        assert!(SourceError::Network("reset".into()).is_transient());
        assert!(!SourceError::RateLimit.is_transient());
        assert_eq!(
            SourceError::from_status("CrossRef", StatusCode::NOT_FOUND).to_string(),
            "CrossRef returned HTTP 404 Not Found"
        );
    }

    #[tokio::test]
    async fn test_default_search_not_implemented() {
        #[derive(Debug)]
        struct Bare;

        #[async_trait]
        impl Source for Bare {
            fn id(&self) -> &str {
                "bare"
            }
            fn name(&self) -> &str {
                "Bare"
            }
        }

        let result = Bare.search("anything", 5).await;
        assert!(matches!(result, Err(SourceError::NotImplemented)));
        assert!(Bare.supports_search());
        assert!(!Bare.provides_abstracts());
    }
}
