//! OpenAlex search backend.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use crate::models::{SearchResult, SearchResultBuilder, SourceType};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::{normalize_identifier, normalize_text, HttpClient};

const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// OpenAlex search backend
///
/// Uses the `title.search` filter of the `/works` endpoint. An email address
/// puts requests in the polite pool.
#[derive(Debug, Clone)]
pub struct OpenAlexSource {
    client: HttpClient,
    base_url: String,
    email: Option<String>,
}

impl OpenAlexSource {
    /// Create a new OpenAlex source
    pub fn new(email: Option<String>) -> Result<Self, SourceError> {
        let email = email.filter(|e| !e.trim().is_empty());
        let user_agent = match &email {
            Some(email) => format!(
                "{}/{} (mailto:{})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                email
            ),
            None => format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        };

        Ok(Self {
            client: HttpClient::with_user_agent(&user_agent)?,
            base_url: OPENALEX_API_BASE.to_string(),
            email,
        })
    }

    /// Point the source at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn search_url(&self, title: &str, max_results: usize) -> String {
        // Commas separate filters in OpenAlex syntax
        let title = title.replace(',', " ");
        let mut url = format!(
            "{}/works?filter=title.search:{}&per-page={}",
            self.base_url,
            urlencoding::encode(&title),
            max_results
        );
        if let Some(ref email) = self.email {
            url = format!("{}&mailto={}", url, urlencoding::encode(email));
        }
        url
    }

    /// Parse OpenAlex work data
    fn parse_work(work: OAWork) -> Option<SearchResult> {
        let title = work.title.or(work.display_name).map(|t| normalize_text(&t))?;
        if title.is_empty() {
            return None;
        }

        let doi = work
            .doi
            .or(work.ids.and_then(|ids| ids.doi))
            .map(|d| normalize_identifier(&d))
            .unwrap_or_default();

        let venue = work
            .primary_location
            .and_then(|loc| loc.source)
            .and_then(|src| src.display_name)
            .unwrap_or_default();

        let authors = work
            .authorships
            .into_iter()
            .filter_map(|a| a.author.display_name);

        let abstract_text = work
            .abstract_inverted_index
            .map(|index| reconstruct_abstract(&index))
            .unwrap_or_default();

        Some(
            SearchResultBuilder::new(title, SourceType::OpenAlex)
                .authors(authors)
                .year(work.publication_year.and_then(|y| u16::try_from(y).ok()))
                .venue(venue)
                .abstract_text(abstract_text)
                .doi(doi)
                .build(),
        )
    }
}

/// Positions past this are dropped when rebuilding an abstract
const MAX_ABSTRACT_WORDS: usize = 20_000;

/// Rebuild abstract text from OpenAlex's word → positions index
fn reconstruct_abstract(index: &HashMap<String, Vec<usize>>) -> String {
    let Some(max_pos) = index
        .values()
        .flatten()
        .copied()
        .filter(|&pos| pos < MAX_ABSTRACT_WORDS)
        .max()
    else {
        return String::new();
    };

    let mut words: Vec<&str> = vec![""; max_pos + 1];
    for (word, positions) in index {
        for &pos in positions.iter().filter(|&&pos| pos < MAX_ABSTRACT_WORDS) {
            words[pos] = word.as_str();
        }
    }
    normalize_text(&words.join(" "))
}

#[async_trait]
impl Source for OpenAlexSource {
    fn id(&self) -> &str {
        "openalex"
    }

    fn name(&self) -> &str {
        "OpenAlex"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::ABSTRACTS
    }

    async fn search(&self, title: &str, max_results: usize) -> Result<Vec<SearchResult>, SourceError> {
        let url = self.search_url(title, max_results);
        tracing::debug!("OpenAlex request: {}", url);

        let data: WorksResponse = self.client.get_json("OpenAlex", &url).await?;

        Ok(data
            .results
            .into_iter()
            .filter_map(Self::parse_work)
            .take(max_results)
            .collect())
    }
}

// ===== OpenAlex API Types =====

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<OAWork>,
}

#[derive(Debug, Deserialize)]
struct OAWork {
    title: Option<String>,
    display_name: Option<String>,
    doi: Option<String>,
    ids: Option<OAIds>,
    publication_year: Option<i32>,
    primary_location: Option<OALocation>,
    #[serde(default)]
    authorships: Vec<OAAuthorship>,
    abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
}

#[derive(Debug, Deserialize)]
struct OAIds {
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OALocation {
    source: Option<OASource>,
}

#[derive(Debug, Deserialize)]
struct OASource {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAAuthorship {
    author: OAAuthor,
}

#[derive(Debug, Deserialize)]
struct OAAuthor {
    display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const WORKS_BODY: &str = r#"{
        "meta": {"count": 2},
        "results": [
            {
                "title": "Attention Is All You Need",
                "doi": "https://doi.org/10.48550/arXiv.1706.03762",
                "publication_year": 2017,
                "primary_location": {"source": {"display_name": "arXiv (Cornell University)"}},
                "authorships": [
                    {"author": {"display_name": "Ashish Vaswani"}},
                    {"author": {"display_name": "Noam Shazeer"}}
                ],
                "abstract_inverted_index": {"The": [0], "dominant": [1], "models": [2, 4], "sequence": [3]}
            },
            {
                "title": null,
                "doi": "https://doi.org/10.1/untitled"
            }
        ]
    }"#;

    #[test]
    fn test_reconstruct_abstract() {
        let mut index = HashMap::new();
        index.insert("world".to_string(), vec![1]);
        index.insert("hello".to_string(), vec![0, 2]);
        assert_eq!(reconstruct_abstract(&index), "hello world hello");
        assert_eq!(reconstruct_abstract(&HashMap::new()), "");
    }

    #[test]
    fn test_reconstruct_abstract_skips_huge_positions() {
        let mut index = HashMap::new();
        index.insert("residual".to_string(), vec![0]);
        index.insert("learning".to_string(), vec![1, 4_000_000_000]);
        assert_eq!(reconstruct_abstract(&index), "residual learning");

        let mut bogus = HashMap::new();
        bogus.insert("only".to_string(), vec![usize::MAX]);
        assert_eq!(reconstruct_abstract(&bogus), "");
    }

    #[test]
    fn test_search_url_includes_mailto() {
        let source = OpenAlexSource::new(Some("me@example.org".to_string())).unwrap();
        let url = source.search_url("deep learning, a review", 5);
        assert!(url.starts_with("https://api.openalex.org/works?filter=title.search:deep%20learning%20%20a%20review"));
        assert!(url.contains("per-page=5"));
        assert!(url.ends_with("mailto=me%40example.org"));
    }

    #[tokio::test]
    async fn test_search_parses_works() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(WORKS_BODY)
            .create_async()
            .await;

        let source = OpenAlexSource::new(None).unwrap().with_base_url(server.url());
        let results = source.search("attention is all you need", 10).await.unwrap();
        mock.assert_async().await;

        assert_eq!(results.len(), 1);
        let first = &results[0];
        assert_eq!(first.title(), "Attention Is All You Need");
        assert_eq!(first.doi(), Some("1706.03762"));
        assert_eq!(first.year(), Some(2017));
        assert_eq!(first.venue(), Some("arXiv (Cornell University)"));
        assert_eq!(first.authors().len(), 2);
        assert_eq!(first.abstract_text(), Some("The dominant models sequence models"));
        assert_eq!(first.source(), &SourceType::OpenAlex);
    }

    #[tokio::test]
    async fn test_search_client_error_is_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(400)
            .create_async()
            .await;

        let source = OpenAlexSource::new(None).unwrap().with_base_url(server.url());
        let result = source.search("anything", 10).await;
        assert!(matches!(
            result,
            Err(SourceError::Status {
                backend: "OpenAlex",
                status: reqwest::StatusCode::BAD_REQUEST,
            })
        ));
    }
}
