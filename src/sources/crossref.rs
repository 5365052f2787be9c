//! CrossRef search backend.

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{SearchResult, SearchResultBuilder, SourceType};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::{normalize_identifier, normalize_text, strip_markup, HttpClient};

const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// Fields requested from `/works`; everything else is left out of the payload
const SELECT_FIELDS: &str = "DOI,title,author,published,container-title,abstract";

/// CrossRef search backend
///
/// Uses the `query.title` field query of the CrossRef REST API.
#[derive(Debug, Clone)]
pub struct CrossRefSource {
    client: HttpClient,
    base_url: String,
}

impl CrossRefSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: CROSSREF_API_BASE.to_string(),
        })
    }

    /// Point the source at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn parse_item(item: CRItem) -> Option<SearchResult> {
        let title = item
            .title
            .into_iter()
            .next()
            .map(|t| strip_markup(&t))
            .filter(|t| !t.is_empty())?;

        let authors = item.author.into_iter().filter_map(CRAuthor::full_name);

        let year = item
            .published
            .and_then(|p| p.date_parts.into_iter().next())
            .and_then(|parts| parts.into_iter().next().flatten())
            .and_then(|y| u16::try_from(y).ok());

        let venue = item
            .container_title
            .into_iter()
            .next()
            .map(|v| normalize_text(&v))
            .unwrap_or_default();

        let abstract_text = item.r#abstract.map(|a| strip_markup(&a)).unwrap_or_default();
        let doi = item.doi.map(|d| normalize_identifier(&d)).unwrap_or_default();

        Some(
            SearchResultBuilder::new(title, SourceType::CrossRef)
                .authors(authors)
                .year(year)
                .venue(venue)
                .abstract_text(abstract_text)
                .doi(doi)
                .build(),
        )
    }
}

#[async_trait]
impl Source for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "CrossRef"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::ABSTRACTS
    }

    async fn search(&self, title: &str, max_results: usize) -> Result<Vec<SearchResult>, SourceError> {
        let url = format!(
            "{}/works?query.title={}&rows={}&select={}",
            self.base_url,
            urlencoding::encode(title),
            max_results,
            SELECT_FIELDS
        );
        tracing::debug!("CrossRef request: {}", url);

        let data: CRResponse = self.client.get_json("CrossRef", &url).await?;

        Ok(data
            .message
            .items
            .into_iter()
            .filter_map(Self::parse_item)
            .take(max_results)
            .collect())
    }
}

// ===== CrossRef API Types =====

#[derive(Debug, Deserialize)]
struct CRResponse {
    message: CRMessage,
}

#[derive(Debug, Deserialize)]
struct CRMessage {
    #[serde(default)]
    items: Vec<CRItem>,
}

#[derive(Debug, Deserialize)]
struct CRItem {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<CRAuthor>,
    published: Option<CRDate>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    r#abstract: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CRAuthor {
    given: Option<String>,
    family: Option<String>,
    /// Organisational authors only carry a name
    name: Option<String>,
}

impl CRAuthor {
    fn full_name(self) -> Option<String> {
        match (self.given, self.family) {
            (Some(given), Some(family)) => Some(format!("{} {}", given.trim(), family.trim())),
            (None, Some(family)) => Some(family),
            (Some(given), None) => Some(given),
            (None, None) => self.name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CRDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i32>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const WORKS_BODY: &str = r#"{
        "status": "ok",
        "message": {
            "total-results": 2,
            "items": [
                {
                    "DOI": "10.1109/CVPR.2016.90",
                    "title": ["Deep Residual Learning for Image Recognition"],
                    "author": [
                        {"given": "Kaiming", "family": "He"},
                        {"name": "Microsoft Research"}
                    ],
                    "published": {"date-parts": [[2016, 6]]},
                    "container-title": ["2016 IEEE Conference on Computer Vision and Pattern Recognition (CVPR)"],
                    "abstract": "<jats:title>Abstract</jats:title><jats:p>Deeper networks are harder to train.</jats:p>"
                },
                {
                    "DOI": "10.1/no-title",
                    "title": []
                }
            ]
        }
    }"#;

    #[tokio::test]
    async fn test_search_parses_items() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_query(Matcher::UrlEncoded(
                "query.title".into(),
                "deep residual learning".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(WORKS_BODY)
            .create_async()
            .await;

        let source = CrossRefSource::new().unwrap().with_base_url(server.url());
        let results = source.search("deep residual learning", 5).await.unwrap();
        mock.assert_async().await;

        assert_eq!(results.len(), 1);
        let first = &results[0];
        assert_eq!(first.title(), "Deep Residual Learning for Image Recognition");
        assert_eq!(first.authors(), &["Kaiming He".to_string(), "Microsoft Research".to_string()]);
        assert_eq!(first.year(), Some(2016));
        assert_eq!(first.doi(), Some("10.1109/CVPR.2016.90"));
        assert_eq!(first.abstract_text(), Some("Deeper networks are harder to train."));
        assert!(first.venue().unwrap().contains("CVPR"));
    }

    #[tokio::test]
    async fn test_search_malformed_body_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let source = CrossRefSource::new().unwrap().with_base_url(server.url());
        let result = source.search("anything", 5).await;
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }
}
