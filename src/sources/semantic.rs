//! Semantic Scholar search backend.

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{SearchResult, SearchResultBuilder, SourceType};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::{normalize_identifier, normalize_text, HttpClient};

const SEMANTIC_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

const SEARCH_FIELDS: &str = "title,authors,year,venue,abstract,externalIds,publicationVenue";

/// Semantic Scholar search backend
///
/// Uses the Graph API `/paper/search` endpoint. An API key raises the
/// otherwise strict shared rate limit.
#[derive(Debug, Clone)]
pub struct SemanticScholarSource {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl SemanticScholarSource {
    /// Create a new Semantic Scholar source
    pub fn new(api_key: Option<String>) -> Result<Self, SourceError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: SEMANTIC_API_BASE.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Point the source at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Add API key to request headers if available
    fn add_api_key_if_present(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref key) = self.api_key {
            builder.header("x-api-key", key)
        } else {
            builder
        }
    }

    /// Parse Semantic Scholar paper data
    fn parse_paper(data: S2Paper) -> Option<SearchResult> {
        let title = data.title.map(|t| normalize_text(&t)).filter(|t| !t.is_empty())?;

        // Prefer the DOI, fall back to the arXiv id
        let identifier = data
            .external_ids
            .and_then(|ids| ids.doi.or(ids.arxiv))
            .map(|id| normalize_identifier(&id))
            .unwrap_or_default();

        let venue = data
            .venue
            .filter(|v| !v.trim().is_empty())
            .or(data.publication_venue.and_then(|v| v.name))
            .unwrap_or_default();

        let authors = data.authors.into_iter().filter_map(|a| a.name);

        Some(
            SearchResultBuilder::new(title, SourceType::SemanticScholar)
                .authors(authors)
                .year(data.year)
                .venue(venue)
                .abstract_text(data.r#abstract.map(|a| normalize_text(&a)).unwrap_or_default())
                .doi(identifier)
                .build(),
        )
    }
}

#[async_trait]
impl Source for SemanticScholarSource {
    fn id(&self) -> &str {
        "semanticscholar"
    }

    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::ABSTRACTS | SourceCapabilities::API_KEY
    }

    async fn search(&self, title: &str, max_results: usize) -> Result<Vec<SearchResult>, SourceError> {
        let url = format!(
            "{}/paper/search?query={}&limit={}&fields={}",
            self.base_url,
            urlencoding::encode(title),
            max_results,
            SEARCH_FIELDS
        );
        tracing::debug!("Semantic Scholar request: {}", url);

        let data: S2SearchResponse = self
            .client
            .json_with("Semantic Scholar", |client| {
                self.add_api_key_if_present(client.get(&url))
            })
            .await?;

        Ok(data
            .data
            .into_iter()
            .filter_map(Self::parse_paper)
            .take(max_results)
            .collect())
    }
}

// ===== Semantic Scholar API Types =====

#[derive(Debug, Deserialize)]
struct S2SearchResponse {
    #[serde(default)]
    data: Vec<S2Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    title: Option<String>,
    year: Option<u16>,
    venue: Option<String>,
    r#abstract: Option<String>,
    external_ids: Option<S2ExternalIds>,
    publication_venue: Option<S2Venue>,
    #[serde(default)]
    authors: Vec<S2Author>,
}

#[derive(Debug, Deserialize)]
struct S2ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Venue {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    name: Option<String>,
}
