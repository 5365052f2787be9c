//! Integration tests for bibhunt
//!
//! These drive the aggregator against mocked HTTP backends and run whole
//! console sessions (type, search, browse, select, resolve) without a
//! terminal.

use bibhunt::config::SearchConfig;
use bibhunt::console::{ConsoleEvent, ConsoleSession, Effect, Phase};
use bibhunt::editor::{InputHistory, Key};
use bibhunt::models::{MergeMode, SearchQuery};
use bibhunt::resolve::BibtexResolver;
use bibhunt::search::{SearchAggregator, SearchOutcome};
use bibhunt::sources::mock::{make_result, MockSource};
use bibhunt::sources::{CrossRefSource, OpenAlexSource, SourceRegistry};
use mockito::Matcher;
use std::sync::Arc;
use std::time::Duration;

const OPENALEX_BODY: &str = r#"{
    "results": [
        {
            "title": "Deep Residual Learning",
            "doi": "https://doi.org/10.1109/cvpr.2016.90",
            "publication_year": 2016,
            "authorships": [{"author": {"display_name": "Kaiming He"}}]
        },
        {
            "title": "Identity Mappings in Deep Residual Networks",
            "doi": "https://doi.org/10.1007/978-3-319-46493-0_38",
            "publication_year": 2016
        }
    ]
}"#;

const CROSSREF_BODY: &str = r#"{
    "status": "ok",
    "message": {
        "items": [
            {
                "DOI": "10.1007/978-3-319-46493-0_38",
                "title": ["Identity Mappings in Deep Residual Networks (CrossRef)"],
                "published": {"date-parts": [[2016]]}
            },
            {
                "DOI": "10.1016/j.patcog.2019.01.006",
                "title": ["Residual networks survey"],
                "published": {"date-parts": [[2019, 1]]}
            }
        ]
    }
}"#;

fn type_text(session: &mut ConsoleSession, text: &str) {
    for c in text.chars() {
        session.handle(ConsoleEvent::Key(Key::Char(c)));
    }
}

fn commit(session: &mut ConsoleSession) -> Vec<Effect> {
    session.handle(ConsoleEvent::Key(Key::Esc));
    session.handle(ConsoleEvent::Key(Key::Enter))
}

fn titles(outcome: &SearchOutcome) -> Vec<String> {
    match outcome {
        SearchOutcome::Results(list) => list.iter().map(|r| r.title().to_string()).collect(),
        SearchOutcome::NoResults => Vec::new(),
    }
}

#[tokio::test]
async fn test_parallel_search_over_http_backends() {
    let mut openalex = mockito::Server::new_async().await;
    let mut crossref = mockito::Server::new_async().await;

    let oa_mock = openalex
        .mock("GET", "/works")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(OPENALEX_BODY)
        .create_async()
        .await;
    let cr_mock = crossref
        .mock("GET", "/works")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(CROSSREF_BODY)
        .create_async()
        .await;

    let mut registry = SourceRegistry::empty();
    registry.register(Arc::new(
        OpenAlexSource::new(None).unwrap().with_base_url(openalex.url()),
    ));
    registry.register(Arc::new(
        CrossRefSource::new().unwrap().with_base_url(crossref.url()),
    ));

    let aggregator = SearchAggregator::new(Arc::new(registry));
    let query = SearchQuery::new("deep residual learning").sources(["openalex", "crossref"]);
    let report = aggregator.run(&query).await;

    oa_mock.assert_async().await;
    cr_mock.assert_async().await;
    assert!(!report.is_degraded());
    // Second OpenAlex record shares its DOI with the first CrossRef record.
    assert_eq!(
        titles(&report.outcome),
        vec![
            "Deep Residual Learning",
            "Identity Mappings in Deep Residual Networks (CrossRef)",
            "Residual networks survey",
        ]
    );
}

#[tokio::test]
async fn test_failing_backend_degrades_search() {
    let mut crossref = mockito::Server::new_async().await;
    crossref
        .mock("GET", "/works")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(CROSSREF_BODY)
        .create_async()
        .await;

    let mut registry = SourceRegistry::empty();
    registry.register(Arc::new(MockSource::new("openalex").failing("connection refused")));
    registry.register(Arc::new(
        CrossRefSource::new().unwrap().with_base_url(crossref.url()),
    ));

    let aggregator = SearchAggregator::new(Arc::new(registry));
    let query = SearchQuery::new("residual").sources(["openalex", "crossref"]);
    let report = aggregator.run(&query).await;

    assert!(report.is_degraded());
    assert_eq!(report.failures[0].source, "openalex");
    assert_eq!(report.result_count(), 2);
}

#[tokio::test]
async fn test_sequential_falls_through_to_second_source() {
    let first = Arc::new(MockSource::new("first"));
    let second = Arc::new(MockSource::new("second").with_results(vec![make_result(
        "From second",
        Some("10.1/second"),
        "second",
    )]));
    let third = Arc::new(MockSource::new("third").with_results(vec![make_result(
        "From third",
        None,
        "third",
    )]));

    let mut registry = SourceRegistry::empty();
    registry.register(first.clone());
    registry.register(second.clone());
    registry.register(third.clone());

    let aggregator = SearchAggregator::new(Arc::new(registry));
    let query = SearchQuery::new("anything")
        .sources(["first", "second", "third"])
        .merge_mode(MergeMode::Sequential);
    let report = aggregator.run(&query).await;

    assert_eq!(titles(&report.outcome), vec!["From second"]);
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
    assert_eq!(third.calls(), 0);
}

#[tokio::test]
async fn test_console_session_title_to_bibtex() {
    let mut registry = SourceRegistry::empty();
    registry.register(Arc::new(MockSource::new("openalex").with_results(vec![
        make_result("Attention Is All You Need", Some("10.48550/arXiv.1706.03762"), "openalex"),
        make_result("Attention Revisited", Some("10.1/revisited"), "openalex"),
    ])));
    let aggregator = SearchAggregator::new(Arc::new(registry)).source_timeout(Duration::from_secs(2));

    let mut resolver_server = mockito::Server::new_async().await;
    let entry = "@article{Revisited, title={Attention Revisited}}";
    let resolve_mock = resolver_server
        .mock("GET", "/10.1/revisited")
        .match_header("accept", "application/x-bibtex")
        .with_status(200)
        .with_body(entry)
        .create_async()
        .await;
    let resolver = BibtexResolver::new().unwrap().with_base_url(resolver_server.url());

    let search = SearchConfig {
        sources: vec!["openalex".to_string()],
        ..SearchConfig::default()
    };
    let mut session = ConsoleSession::new(search, InputHistory::new(10));

    type_text(&mut session, "attention");
    let effects = commit(&mut session);
    let (generation, query) = effects
        .into_iter()
        .find_map(|effect| match effect {
            Effect::RunSearch { generation, query } => Some((generation, query)),
            _ => None,
        })
        .expect("search requested");
    assert_eq!(session.history().entries(), ["attention".to_string()]);

    let report = aggregator.run(&query).await;
    session.handle(ConsoleEvent::SearchFinished { generation, report });
    assert!(matches!(session.phase(), Phase::Browsing { .. }));

    session.handle(ConsoleEvent::Key(Key::Down));
    session.handle(ConsoleEvent::Key(Key::Down));
    let effects = session.handle(ConsoleEvent::Key(Key::Enter));
    let (generation, identifier) = match effects.as_slice() {
        [Effect::Resolve {
            generation,
            identifier,
        }] => (*generation, identifier.clone()),
        other => panic!("unexpected effects {:?}", other),
    };
    assert_eq!(identifier, "10.1/revisited");

    let result = resolver.resolve(&identifier).await;
    resolve_mock.assert_async().await;
    session.handle(ConsoleEvent::RecordResolved { generation, result });

    match session.phase() {
        Phase::Viewing { text, bibtex } => {
            assert!(*bibtex);
            assert_eq!(text, entry);
        }
        other => panic!("unexpected phase {:?}", other),
    }
    assert_eq!(session.resolved_entries(), [entry.to_string()]);

    session.handle(ConsoleEvent::Key(Key::Char('x')));
    assert!(matches!(session.phase(), Phase::Editing));
    assert!(session.editor().buffer().is_blank());
}

#[tokio::test]
async fn test_console_session_all_sources_failing() {
    let mut registry = SourceRegistry::empty();
    registry.register(Arc::new(MockSource::new("openalex").failing("boom")));
    registry.register(Arc::new(
        MockSource::new("crossref").with_delay(Duration::from_secs(5)),
    ));
    let aggregator =
        SearchAggregator::new(Arc::new(registry)).source_timeout(Duration::from_millis(100));

    let search = SearchConfig {
        sources: vec!["openalex".to_string(), "crossref".to_string()],
        ..SearchConfig::default()
    };
    let mut session = ConsoleSession::new(search, InputHistory::new(10));
    type_text(&mut session, "lost paper");
    let effects = commit(&mut session);
    let Some(Effect::RunSearch { generation, query }) = effects.into_iter().last() else {
        panic!("search requested");
    };

    let report = aggregator.run(&query).await;
    assert!(matches!(report.outcome, SearchOutcome::NoResults));
    assert_eq!(report.failures.len(), 2);

    session.handle(ConsoleEvent::SearchFinished { generation, report });
    assert!(matches!(session.phase(), Phase::Editing));
    assert_eq!(session.editor().buffer().text(), "lost paper");
    assert!(session.status().unwrap().message.contains("No results"));
}
