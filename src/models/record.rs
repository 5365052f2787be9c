//! Bibliographic record returned by any search backend.

use serde::{Deserialize, Serialize};

/// The backend a record was found on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    OpenAlex,
    CrossRef,
    SemanticScholar,
    #[serde(untagged)]
    Other(String),
}

impl SourceType {
    /// Returns the display name of the source
    pub fn name(&self) -> &str {
        match self {
            SourceType::OpenAlex => "OpenAlex",
            SourceType::CrossRef => "CrossRef",
            SourceType::SemanticScholar => "Semantic Scholar",
            SourceType::Other(s) => s,
        }
    }

    /// Returns the source identifier used in configuration
    pub fn id(&self) -> &str {
        match self {
            SourceType::OpenAlex => "openalex",
            SourceType::CrossRef => "crossref",
            SourceType::SemanticScholar => "semanticscholar",
            SourceType::Other(s) => s,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A candidate record for the user's query.
///
/// Fields are private so a record cannot change after the backend built it;
/// use [`SearchResultBuilder`] to construct one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    title: String,
    authors: Vec<String>,
    year: Option<u16>,
    venue: Option<String>,
    r#abstract: Option<String>,
    doi: Option<String>,
    source: SourceType,
}

impl SearchResult {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Author names in the order the backend listed them
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn year(&self) -> Option<u16> {
        self.year
    }

    pub fn venue(&self) -> Option<&str> {
        self.venue.as_deref()
    }

    /// Abstract text, `None` when the backend had none or it was blank
    pub fn abstract_text(&self) -> Option<&str> {
        self.r#abstract.as_deref()
    }

    /// DOI (or bare arXiv id for preprints), used as the dedup key
    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref()
    }

    pub fn source(&self) -> &SourceType {
        &self.source
    }

    /// Whether there is a non-empty abstract to show
    pub fn has_abstract(&self) -> bool {
        self.r#abstract.is_some()
    }

    /// Comma-separated author list truncated to `max` names.
    pub fn author_summary(&self, max: usize) -> String {
        if self.authors.is_empty() {
            return "Unknown authors".to_string();
        }

        let mut names: Vec<&str> = self.authors.iter().take(max).map(|s| s.as_str()).collect();
        if self.authors.len() > max {
            names.push("et al.");
        }
        names.join(", ")
    }
}

/// Builder for constructing SearchResult objects
#[derive(Debug, Clone)]
pub struct SearchResultBuilder {
    result: SearchResult,
}

impl SearchResultBuilder {
    /// Create a new builder with required fields
    pub fn new(title: impl Into<String>, source: SourceType) -> Self {
        Self {
            result: SearchResult {
                title: title.into(),
                authors: Vec::new(),
                year: None,
                venue: None,
                r#abstract: None,
                doi: None,
                source,
            },
        }
    }

    /// Set authors
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.result.authors = authors
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| !name.trim().is_empty())
            .collect();
        self
    }

    /// Add a single author
    pub fn author(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.result.authors.push(name);
        }
        self
    }

    /// Set publication year
    pub fn year(mut self, year: Option<u16>) -> Self {
        self.result.year = year;
        self
    }

    /// Set venue or journal name; blank strings are dropped
    pub fn venue(mut self, venue: impl Into<String>) -> Self {
        self.result.venue = non_blank(venue.into());
        self
    }

    /// Set abstract; blank strings are dropped
    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.result.r#abstract = non_blank(abstract_text.into());
        self
    }

    /// Set DOI; blank strings are dropped
    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.result.doi = non_blank(doi.into());
        self
    }

    /// Build the SearchResult
    pub fn build(self) -> SearchResult {
        self.result
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
