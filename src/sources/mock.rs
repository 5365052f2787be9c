//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::models::{SearchResult, SearchResultBuilder, SourceType};
use crate::sources::{Source, SourceCapabilities, SourceError};

/// A mock source for testing that returns predefined responses.
#[derive(Debug)]
pub struct MockSource {
    id: String,
    results: Vec<SearchResult>,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a mock source that returns no results
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            results: Vec::new(),
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Return these results from every search
    pub fn with_results(mut self, results: Vec<SearchResult>) -> Self {
        self.results = results;
        self
    }

    /// Fail every search with a network error carrying `message`
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `search` was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::ABSTRACTS
    }

    async fn search(&self, _title: &str, max_results: usize) -> Result<Vec<SearchResult>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.failure {
            Some(message) => Err(SourceError::Network(message.clone())),
            None => Ok(self.results.iter().take(max_results).cloned().collect()),
        }
    }
}

/// Helper function to create a mock record for testing.
pub fn make_result(title: &str, doi: Option<&str>, source: &str) -> SearchResult {
    let builder = SearchResultBuilder::new(title, SourceType::Other(source.to_string()))
        .author("Test Author")
        .year(Some(2020));
    match doi {
        Some(doi) => builder.doi(doi).build(),
        None => builder.build(),
    }
}
