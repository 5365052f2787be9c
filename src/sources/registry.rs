//! Registry of the compiled-in search backends.

use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "source-crossref")]
use super::CrossRefSource;
#[cfg(feature = "source-openalex")]
use super::OpenAlexSource;
#[cfg(feature = "source-semantic")]
use super::SemanticScholarSource;
use super::{Source, SourceError};
use crate::config::ApiKeysConfig;

/// Source used when none of the configured identifiers resolve
pub const FALLBACK_SOURCE: &str = "openalex";

bitflags::bitflags! {
    /// Capabilities that a source can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const SEARCH = 1 << 0;
        const ABSTRACTS = 1 << 1;
        const API_KEY = 1 << 2;
    }
}

/// Registry for all available search backends
///
/// Sources are keyed by [`Source::id`]; the order in which they are queried
/// is decided by [`SourceRegistry::select`], not by the registry itself.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create a registry with every compiled-in backend
    #[allow(unused_variables)]
    pub fn new(keys: &ApiKeysConfig) -> Result<Self, SourceError> {
        #[allow(unused_mut)]
        let mut registry = Self::empty();

        #[cfg(feature = "source-openalex")]
        registry.register(Arc::new(OpenAlexSource::new(keys.openalex_email.clone())?));
        #[cfg(feature = "source-crossref")]
        registry.register(Arc::new(CrossRefSource::new()?));
        #[cfg(feature = "source-semantic")]
        registry.register(Arc::new(SemanticScholarSource::new(
            keys.semantic_scholar.clone(),
        )?));

        Ok(registry)
    }

    /// Create a registry with no sources
    pub fn empty() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// Register a new source, replacing any source with the same id
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.id().to_string(), source);
    }

    /// Get a source by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Source>> {
        self.sources.get(id)
    }

    /// Get all registered sources
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.values()
    }

    /// All source IDs, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sources.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Resolve configured identifiers into an ordered source list.
    ///
    /// Identifiers are matched case-insensitively. Unknown or repeated
    /// identifiers are skipped with a warning. If nothing resolves, the
    /// fallback source is used when registered.
    pub fn select<S: AsRef<str>>(&self, ids: &[S]) -> Vec<Arc<dyn Source>> {
        let mut selected: Vec<Arc<dyn Source>> = Vec::new();

        for raw in ids {
            let id = raw.as_ref().trim().to_lowercase();
            match self.sources.get(&id) {
                Some(source) if selected.iter().any(|s| s.id() == source.id()) => {
                    tracing::warn!("Source '{}' listed more than once, ignoring repeat", id);
                }
                Some(source) => selected.push(Arc::clone(source)),
                None => tracing::warn!("Unknown source '{}' in configuration, skipping", id),
            }
        }

        if selected.is_empty() {
            if let Some(fallback) = self.sources.get(FALLBACK_SOURCE) {
                tracing::warn!("No configured source available, falling back to {}", FALLBACK_SOURCE);
                selected.push(Arc::clone(fallback));
            }
        }

        selected
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockSource;

    fn mock_registry() -> SourceRegistry {
        let mut registry = SourceRegistry::empty();
        registry.register(Arc::new(MockSource::new("openalex")));
        registry.register(Arc::new(MockSource::new("crossref")));
        registry.register(Arc::new(MockSource::new("semanticscholar")));
        registry
    }

    #[cfg(feature = "full")]
    #[test]
    fn test_all_backends_registered() {
        let registry = SourceRegistry::new(&ApiKeysConfig::default()).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.ids(), vec!["crossref", "openalex", "semanticscholar"]);

        let semantic = registry.get("semanticscholar").unwrap();
        assert!(semantic.capabilities().contains(SourceCapabilities::API_KEY));
        let crossref = registry.get("crossref").unwrap();
        assert!(crossref.supports_search());
    }

    #[test]
    fn test_select_preserves_configured_order() {
        let registry = mock_registry();
        let selected = registry.select(&["semanticscholar", "OpenAlex"]);
        let ids: Vec<&str> = selected.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["semanticscholar", "openalex"]);
    }

    #[test]
    fn test_select_skips_unknown_and_repeats() {
        let registry = mock_registry();
        let selected = registry.select(&["crossref", "dblp", "crossref"]);
        let ids: Vec<&str> = selected.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["crossref"]);
    }

    #[test]
    fn test_select_falls_back_to_openalex() {
        let registry = mock_registry();
        let selected = registry.select(&["nonexistent"]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id(), FALLBACK_SOURCE);

        let empty: [&str; 0] = [];
        assert_eq!(registry.select(&empty)[0].id(), FALLBACK_SOURCE);
    }

    #[test]
    fn test_select_without_fallback_is_empty() {
        let mut registry = SourceRegistry::empty();
        registry.register(Arc::new(MockSource::new("crossref")));
        assert!(registry.select(&["nonexistent"]).is_empty());
    }
}
