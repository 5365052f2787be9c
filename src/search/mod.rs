//! Multi-source search aggregation.
//!
//! [`SearchAggregator::run`] queries the configured sources and produces a
//! single DOI-deduplicated [`ResultList`]:
//!
//! - **parallel**: every source is queried concurrently, each under its own
//!   timeout. Once all have finished the per-source lists are interleaved
//!   with [`merge_round_robin`], so the order never depends on which backend
//!   answered first.
//! - **sequential**: sources are tried in order and the first non-empty answer
//!   wins; later sources are never contacted.
//!
//! A failing or slow source never aborts the query. It is reported in
//! [`SearchReport::failures`] and contributes nothing to the merge.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::models::{MergeMode, ResultList, SearchQuery, SearchResult};
use crate::sources::{Source, SourceError, SourceRegistry};

/// Default per-source deadline
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// One backend that errored or timed out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    /// Source identifier
    pub source: String,
    /// Human-readable reason
    pub reason: String,
}

impl SourceFailure {
    fn new(source: &str, reason: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source, self.reason)
    }
}

/// Final outcome of an aggregate query
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// At least one record was found
    Results(ResultList),
    /// Every source was empty or failed
    NoResults,
}

/// Outcome plus the sources that degraded along the way
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    pub failures: Vec<SourceFailure>,
}

impl SearchReport {
    fn new(results: ResultList, failures: Vec<SourceFailure>) -> Self {
        let outcome = if results.is_empty() {
            SearchOutcome::NoResults
        } else {
            SearchOutcome::Results(results)
        };
        Self { outcome, failures }
    }

    /// Whether any source failed
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Number of merged results
    pub fn result_count(&self) -> usize {
        match &self.outcome {
            SearchOutcome::Results(list) => list.len(),
            SearchOutcome::NoResults => 0,
        }
    }

    /// Take the result list, empty for `NoResults`
    pub fn into_results(self) -> ResultList {
        match self.outcome {
            SearchOutcome::Results(list) => list,
            SearchOutcome::NoResults => ResultList::new(),
        }
    }
}

/// Interleave per-source lists, first result of each source in turn, then
/// the second of each, and so on.
///
/// Later candidates whose DOI is already present are dropped; records
/// without a DOI are always kept.
pub fn merge_round_robin(per_source: Vec<Vec<SearchResult>>) -> ResultList {
    let mut iters: Vec<_> = per_source.into_iter().map(Vec::into_iter).collect();
    let mut merged = ResultList::new();

    loop {
        let mut progressed = false;
        for iter in iters.iter_mut() {
            if let Some(result) = iter.next() {
                progressed = true;
                if !merged.push(result) {
                    tracing::trace!("Dropped duplicate DOI during merge");
                }
            }
        }
        if !progressed {
            break;
        }
    }

    merged
}

/// Dispatches queries to the configured sources and merges their answers
#[derive(Debug, Clone)]
pub struct SearchAggregator {
    registry: Arc<SourceRegistry>,
    source_timeout: Duration,
}

impl SearchAggregator {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self {
            registry,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }

    /// Set the deadline applied to each source independently
    pub fn source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Run `query` against its sources using its merge mode.
    pub async fn run(&self, query: &SearchQuery) -> SearchReport {
        let text = query.text.trim();
        if text.is_empty() {
            return SearchReport::new(ResultList::new(), Vec::new());
        }

        let sources = self.registry.select(&query.sources);
        if sources.is_empty() {
            tracing::warn!("No search sources available");
            return SearchReport::new(ResultList::new(), Vec::new());
        }

        tracing::info!(
            "Searching {} source(s) ({}) for: {}",
            sources.len(),
            query.merge_mode,
            text
        );

        let report = match query.merge_mode {
            MergeMode::Parallel => self.run_parallel(sources, text, query.max_results).await,
            MergeMode::Sequential => self.run_sequential(sources, text, query.max_results).await,
        };

        tracing::info!(
            "Search finished with {} result(s), {} degraded source(s)",
            report.result_count(),
            report.failures.len()
        );
        report
    }

    async fn run_parallel(
        &self,
        sources: Vec<Arc<dyn Source>>,
        text: &str,
        max_results: usize,
    ) -> SearchReport {
        // Dropping the set aborts whatever is still running
        let mut tasks = JoinSet::new();
        for (index, source) in sources.iter().enumerate() {
            let source = Arc::clone(source);
            let text = text.to_string();
            let deadline = self.source_timeout;
            tasks.spawn(async move {
                let result = query_source(source.as_ref(), &text, max_results, deadline).await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<Vec<SearchResult>, SourceError>>> =
            (0..sources.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::warn!("Search task did not complete: {}", e),
            }
        }

        let mut failures = Vec::new();
        let mut per_source = Vec::with_capacity(sources.len());
        for (source, slot) in sources.iter().zip(slots) {
            match slot {
                Some(Ok(results)) => {
                    tracing::debug!("{} returned {} result(s)", source.id(), results.len());
                    per_source.push(results);
                }
                Some(Err(e)) => {
                    tracing::warn!("Source {} failed: {}", source.id(), e);
                    failures.push(SourceFailure::new(source.id(), e.to_string()));
                    per_source.push(Vec::new());
                }
                None => {
                    failures.push(SourceFailure::new(source.id(), "search task aborted"));
                    per_source.push(Vec::new());
                }
            }
        }

        let mut merged = merge_round_robin(per_source);
        merged.truncate(max_results);
        SearchReport::new(merged, failures)
    }

    async fn run_sequential(
        &self,
        sources: Vec<Arc<dyn Source>>,
        text: &str,
        max_results: usize,
    ) -> SearchReport {
        let mut failures = Vec::new();

        for source in sources {
            match query_source(source.as_ref(), text, max_results, self.source_timeout).await {
                Ok(results) if !results.is_empty() => {
                    tracing::debug!("{} returned {} result(s)", source.id(), results.len());
                    let mut list: ResultList = results.into_iter().collect();
                    list.truncate(max_results);
                    return SearchReport::new(list, failures);
                }
                Ok(_) => tracing::debug!("{} returned no results, trying next source", source.id()),
                Err(e) => {
                    tracing::warn!("Source {} failed: {}", source.id(), e);
                    failures.push(SourceFailure::new(source.id(), e.to_string()));
                }
            }
        }

        SearchReport::new(ResultList::new(), failures)
    }
}

async fn query_source(
    source: &dyn Source,
    text: &str,
    max_results: usize,
    deadline: Duration,
) -> Result<Vec<SearchResult>, SourceError> {
    match timeout(deadline, source.search(text, max_results)).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::make_result;
    use crate::sources::MockSource;

    fn titles(list: &ResultList) -> Vec<&str> {
        list.iter().map(|r| r.title()).collect()
    }

    fn registry_of(sources: Vec<Arc<MockSource>>) -> Arc<SourceRegistry> {
        let mut registry = SourceRegistry::empty();
        for source in sources {
            registry.register(source);
        }
        Arc::new(registry)
    }

    #[test]
    fn test_merge_interleaves_in_source_order() {
        let a = vec![
            make_result("A1", Some("10.1/a1"), "a"),
            make_result("A2", Some("10.1/a2"), "a"),
            make_result("A3", Some("10.1/a3"), "a"),
        ];
        let b = vec![
            make_result("B1", Some("10.1/b1"), "b"),
            make_result("B2", Some("10.1/b2"), "b"),
        ];
        let c = vec![make_result("C1", Some("10.1/c1"), "c")];

        let merged = merge_round_robin(vec![a, b, c]);
        assert_eq!(titles(&merged), vec!["A1", "B1", "C1", "A2", "B2", "A3"]);
    }

    #[test]
    fn test_merge_drops_later_duplicate_doi() {
        let a = vec![
            make_result("A1", Some("10.1/a1"), "a"),
            make_result("A2", Some("10.1/shared"), "a"),
            make_result("A3", Some("10.1/a3"), "a"),
        ];
        let b = vec![
            make_result("B1", Some("10.1/shared"), "b"),
            make_result("B2", None, "b"),
        ];
        let c = vec![make_result("C1", None, "c")];

        let merged = merge_round_robin(vec![a, b, c]);
        assert_eq!(titles(&merged), vec!["A1", "B1", "C1", "B2", "A3"]);
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        assert!(merge_round_robin(vec![Vec::new(), Vec::new()]).is_empty());
        assert!(merge_round_robin(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn test_parallel_order_ignores_response_timing() {
        let slow = Arc::new(
            MockSource::new("openalex")
                .with_results(vec![make_result("A1", Some("10.1/a1"), "a")])
                .with_delay(Duration::from_millis(50)),
        );
        let fast = Arc::new(
            MockSource::new("crossref").with_results(vec![make_result("B1", Some("10.1/b1"), "b")]),
        );
        let aggregator = SearchAggregator::new(registry_of(vec![slow, fast]));

        let query = SearchQuery::new("title").sources(["openalex", "crossref"]);
        let report = aggregator.run(&query).await;

        assert!(!report.is_degraded());
        assert_eq!(titles(&report.into_results()), vec!["A1", "B1"]);
    }

    #[tokio::test]
    async fn test_parallel_timeout_degrades_single_source() {
        let hung = Arc::new(
            MockSource::new("openalex")
                .with_results(vec![make_result("late", None, "a")])
                .with_delay(Duration::from_secs(5)),
        );
        let ok = Arc::new(
            MockSource::new("crossref").with_results(vec![make_result("B1", None, "b")]),
        );
        let aggregator = SearchAggregator::new(registry_of(vec![hung, ok]))
            .source_timeout(Duration::from_millis(50));

        let query = SearchQuery::new("title").sources(["openalex", "crossref"]);
        let report = aggregator.run(&query).await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, "openalex");
        assert_eq!(titles(&report.into_results()), vec!["B1"]);
    }

    #[tokio::test]
    async fn test_parallel_respects_max_results() {
        let a = Arc::new(MockSource::new("openalex").with_results(vec![
            make_result("A1", None, "a"),
            make_result("A2", None, "a"),
        ]));
        let b = Arc::new(MockSource::new("crossref").with_results(vec![
            make_result("B1", None, "b"),
            make_result("B2", None, "b"),
        ]));
        let aggregator = SearchAggregator::new(registry_of(vec![a, b]));

        let query = SearchQuery::new("title")
            .sources(["openalex", "crossref"])
            .max_results(3);
        let report = aggregator.run(&query).await;
        assert_eq!(titles(&report.into_results()), vec!["A1", "B1", "A2"]);
    }

    #[tokio::test]
    async fn test_sequential_stops_at_first_non_empty() {
        let empty = Arc::new(MockSource::new("openalex"));
        let second = Arc::new(
            MockSource::new("crossref").with_results(vec![make_result("B1", Some("10.1/b1"), "b")]),
        );
        let third = Arc::new(
            MockSource::new("semanticscholar").with_results(vec![make_result("C1", None, "c")]),
        );
        let aggregator = SearchAggregator::new(registry_of(vec![
            Arc::clone(&empty),
            Arc::clone(&second),
            Arc::clone(&third),
        ]));

        let query = SearchQuery::new("title")
            .sources(["openalex", "crossref", "semanticscholar"])
            .merge_mode(MergeMode::Sequential);
        let report = aggregator.run(&query).await;

        assert_eq!(titles(&report.into_results()), vec!["B1"]);
        assert_eq!(empty.calls(), 1);
        assert_eq!(second.calls(), 1);
        assert_eq!(third.calls(), 0);
    }

    #[tokio::test]
    async fn test_sequential_skips_failures() {
        let broken = Arc::new(MockSource::new("openalex").failing("connection refused"));
        let ok = Arc::new(
            MockSource::new("crossref").with_results(vec![make_result("B1", None, "b")]),
        );
        let aggregator = SearchAggregator::new(registry_of(vec![broken, ok]));

        let query = SearchQuery::new("title")
            .sources(["openalex", "crossref"])
            .merge_mode(MergeMode::Sequential);
        let report = aggregator.run(&query).await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.result_count(), 1);
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_no_results() {
        for mode in [MergeMode::Parallel, MergeMode::Sequential] {
            let a = Arc::new(MockSource::new("openalex").failing("down"));
            let b = Arc::new(MockSource::new("crossref").failing("down"));
            let aggregator = SearchAggregator::new(registry_of(vec![a, b]));

            let query = SearchQuery::new("title")
                .sources(["openalex", "crossref"])
                .merge_mode(mode);
            let report = aggregator.run(&query).await;

            assert!(matches!(report.outcome, SearchOutcome::NoResults));
            assert_eq!(report.failures.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_blank_query_contacts_nobody() {
        let source = Arc::new(MockSource::new("openalex"));
        let aggregator = SearchAggregator::new(registry_of(vec![Arc::clone(&source)]));

        let report = aggregator.run(&SearchQuery::new("   ")).await;
        assert!(matches!(report.outcome, SearchOutcome::NoResults));
        assert_eq!(source.calls(), 0);
    }
}
