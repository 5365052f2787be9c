//! Hand-off of a chosen record to BibTeX.
//!
//! The DOI (or arXiv id) is resolved through doi.org content negotiation,
//! which returns the registrar's raw BibTeX entry.

use regex::Regex;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use std::sync::OnceLock;

use crate::sources::SourceError;
use crate::utils::{cached_regex, normalize_identifier, HttpClient};

const DOI_RESOLVER_BASE: &str = "https://doi.org";

/// Errors while fetching BibTeX for an identifier
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("'{0}' is not a DOI or arXiv identifier")]
    InvalidIdentifier(String),

    #[error("No record registered for {0}")]
    NotFound(String),

    #[error("Resolver returned status: {0}")]
    Api(StatusCode),

    #[error("Resolver returned an empty entry")]
    Empty,

    #[error(transparent)]
    Source(#[from] SourceError),
}

fn arxiv_id() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"^(?i:arxiv:)?(\d{4}\.\d{4,5})(v\d+)?$")
}

/// Turn user input or a record identifier into a resolvable DOI.
///
/// Bare arXiv ids map to their DataCite DOI (version suffix dropped).
pub fn doi_for_identifier(identifier: &str) -> Result<String, ResolveError> {
    let normalized = normalize_identifier(identifier);
    if let Some(caps) = arxiv_id().and_then(|re| re.captures(&normalized)) {
        return Ok(format!("10.48550/arXiv.{}", &caps[1]));
    }
    if normalized.starts_with("10.") && normalized.contains('/') {
        return Ok(normalized);
    }
    Err(ResolveError::InvalidIdentifier(identifier.trim().to_string()))
}

/// Fetches raw BibTeX for DOIs
#[derive(Debug, Clone)]
pub struct BibtexResolver {
    client: HttpClient,
    base_url: String,
}

impl BibtexResolver {
    pub fn new() -> Result<Self, ResolveError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: DOI_RESOLVER_BASE.to_string(),
        })
    }

    /// Point the resolver at another host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch the BibTeX entry for `identifier`
    pub async fn resolve(&self, identifier: &str) -> Result<String, ResolveError> {
        let doi = doi_for_identifier(identifier)?;
        let path = doi
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let url = format!("{}/{}", self.base_url, path);
        tracing::info!("Resolving {} to BibTeX", doi);

        let response = self
            .client
            .send("doi.org", |client| {
                client.get(&url).header(ACCEPT, "application/x-bibtex")
            })
            .await
            .map_err(|e| match e {
                SourceError::Status {
                    status: StatusCode::NOT_FOUND,
                    ..
                } => ResolveError::NotFound(doi.clone()),
                SourceError::Status { status, .. } => ResolveError::Api(status),
                other => ResolveError::Source(other),
            })?;

        let body = response.text().await.map_err(SourceError::from)?;
        let entry = body.trim();
        if entry.is_empty() {
            return Err(ResolveError::Empty);
        }
        Ok(entry.to_string())
    }
}
