//! Search request models.

use serde::{Deserialize, Serialize};

/// How results from several sources are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Query every source concurrently and interleave their results
    #[default]
    Parallel,
    /// Query sources one by one, stopping at the first with results
    Sequential,
}

impl std::fmt::Display for MergeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeMode::Parallel => write!(f, "parallel"),
            MergeMode::Sequential => write!(f, "sequential"),
        }
    }
}

/// A committed query plus the source selection it should run against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Normalized query text
    pub text: String,

    /// Source identifiers, in priority order
    pub sources: Vec<String>,

    /// Merge policy
    pub merge_mode: MergeMode,

    /// Results requested from each source, and cap on the merged list
    pub max_results: usize,
}

impl SearchQuery {
    /// Create a new search query with default sources and settings
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: vec![
                "openalex".to_string(),
                "crossref".to_string(),
                "semanticscholar".to_string(),
            ],
            merge_mode: MergeMode::default(),
            max_results: 10,
        }
    }

    /// Set the ordered source list
    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Set merge mode
    pub fn merge_mode(mut self, mode: MergeMode) -> Self {
        self.merge_mode = mode;
        self
    }

    /// Set maximum results
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }
}
