//! Pagination and deduplication against a mocked bulk search endpoint.

mod common;

use std::sync::Arc;

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{BULK_PATH, arxiv_paper, doi_paper, page, paper_json, test_config};
use venue_harvest::client::SemanticScholarClient;
use venue_harvest::error::QueryFailure;
use venue_harvest::search::{DedupCollector, PaginationWalker, RunContext, SearchFilters};

fn walker(server: &MockServer) -> PaginationWalker {
    let client = SemanticScholarClient::new(test_config(server)).unwrap();
    PaginationWalker::new(Arc::new(client))
}

fn filters() -> SearchFilters {
    SearchFilters::new(vec!["Interspeech".into()], Some(2020), Some(2024))
}

fn terms(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| (*t).to_string()).collect()
}

// =============================================================================
// PaginationWalker
// =============================================================================

#[tokio::test]
async fn test_single_page_without_token_stops() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .and(query_param("query", "ASR"))
        .and(query_param("venue", "Interspeech"))
        .and(query_param("year", "2020-2024"))
        .and(query_param_is_missing("token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![doi_paper("p1", "10.1/a"), doi_paper("p2", "10.1/b")],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let items: Vec<_> = walker(&server).walk("ASR", &filters()).collect().await;

    assert_eq!(items.len(), 2);
    let ids: Vec<_> = items.into_iter().map(|r| r.unwrap().paper_id).collect();
    assert_eq!(ids, vec!["p1", "p2"]);
}

#[tokio::test]
async fn test_follows_tokens_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .and(query_param_is_missing("token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![doi_paper("p1", "10.1/a")], Some("t1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .and(query_param("token", "t1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![doi_paper("p2", "10.1/b")], Some("t2"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .and(query_param("token", "t2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![doi_paper("p3", "10.1/c")], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let items: Vec<_> = walker(&server).walk("ASR", &filters()).collect().await;
    let ids: Vec<_> = items.into_iter().map(|r| r.unwrap().paper_id).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);
}

#[tokio::test]
async fn test_required_fields_always_requested() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .and(query_param("fields", "title,year,externalIds,authors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;

    let filters = filters().with_fields(vec!["title".into(), "year".into()]);
    let items: Vec<_> = walker(&server).walk("ASR", &filters).collect().await;
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_server_error_ends_term_with_depth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .and(query_param_is_missing("token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![doi_paper("p1", "10.1/a")], Some("t1"))),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .and(query_param("token", "t1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;

    let items: Vec<_> = walker(&server).walk("ASR", &filters()).collect().await;

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    let err = items[1].as_ref().unwrap_err();
    assert_eq!(err.term, "ASR");
    assert_eq!(err.depth, 1);
    assert!(matches!(err.source, QueryFailure::Request(_)));
}

#[tokio::test]
async fn test_repeated_token_is_stalled_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![doi_paper("p1", "10.1/a")], Some("same"))),
        )
        .expect(2)
        .mount(&server)
        .await;

    let items: Vec<_> = walker(&server).walk("ASR", &filters()).collect().await;

    assert_eq!(items.len(), 3);
    let err = items[2].as_ref().unwrap_err();
    assert_eq!(err.depth, 2);
    assert!(matches!(err.source, QueryFailure::StalledCursor));
}

#[tokio::test]
async fn test_walk_is_lazy() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .expect(0)
        .mount(&server)
        .await;

    let stream = walker(&server).walk("ASR", &filters());
    drop(stream);
}

// =============================================================================
// DedupCollector
// =============================================================================

#[tokio::test]
async fn test_duplicates_across_terms_keep_first_term() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .and(query_param("query", "ASR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![doi_paper("p1", "10.1/shared"), arxiv_paper("p2", "2101.00001")],
            None,
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .and(query_param("query", "TTS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                doi_paper("p1-again", "10.1/shared"),
                doi_paper("p3", "10.1/other"),
                doi_paper("p3-dup", "10.1/other"),
            ],
            None,
        )))
        .mount(&server)
        .await;

    let collector = DedupCollector::new(walker(&server));
    let terms = terms(&["ASR", "TTS"]);
    let filters = filters();
    let mut ctx = RunContext::new();

    let records: Vec<_> = collector.collect(&terms, &filters, &mut ctx).collect().await;

    let keys: Vec<_> = records.iter().map(|r| (r.dedup_key.value.as_str(), r.term.as_str())).collect();
    assert_eq!(keys, vec![("10.1/shared", "ASR"), ("2101.00001", "ASR"), ("10.1/other", "TTS")]);

    let stats = ctx.stats();
    assert_eq!(stats.terms, 2);
    assert_eq!(stats.raw, 5);
    assert_eq!(stats.emitted, 3);
    assert_eq!(stats.duplicates, 2);
}

#[tokio::test]
async fn test_missing_identifier_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                paper_json("bare", "No ids", json!({})),
                paper_json("null-ids", "Null ids", serde_json::Value::Null),
                doi_paper("p1", "10.1/a"),
            ],
            None,
        )))
        .mount(&server)
        .await;

    let collector = DedupCollector::new(walker(&server));
    let terms = terms(&["ASR"]);
    let filters = filters();
    let mut ctx = RunContext::new();

    let records: Vec<_> = collector.collect(&terms, &filters, &mut ctx).collect().await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].paper.paper_id, "p1");
    assert_eq!(ctx.stats().missing_identifier, 2);
}

#[tokio::test]
async fn test_failed_term_does_not_stop_batch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .and(query_param("query", "ASR"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .and(query_param("query", "TTS"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![doi_paper("p1", "10.1/a")], None)),
        )
        .mount(&server)
        .await;

    let collector = DedupCollector::new(walker(&server));
    let terms = terms(&["ASR", "TTS"]);
    let filters = filters();
    let mut ctx = RunContext::new();

    let records: Vec<_> = collector.collect(&terms, &filters, &mut ctx).collect().await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].term, "TTS");
    assert_eq!(ctx.stats().query_errors, 1);
}

#[tokio::test]
async fn test_max_results_stops_paging() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .and(query_param_is_missing("token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![doi_paper("p1", "10.1/a"), doi_paper("p2", "10.1/b")],
            Some("t1"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .and(query_param("token", "t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .expect(0)
        .mount(&server)
        .await;

    let collector = DedupCollector::new(walker(&server)).with_max_results(Some(2));
    let terms = terms(&["ASR", "TTS"]);
    let filters = filters();
    let mut ctx = RunContext::new();

    let records: Vec<_> = collector.collect(&terms, &filters, &mut ctx).collect().await;

    assert_eq!(records.len(), 2);
    assert_eq!(ctx.stats().terms, 1);
}

#[tokio::test]
async fn test_seeded_keys_are_not_emitted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BULK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![doi_paper("p1", "10.1/a"), doi_paper("p2", "10.1/b")],
            None,
        )))
        .mount(&server)
        .await;

    let collector = DedupCollector::new(walker(&server));
    let terms = terms(&["ASR"]);
    let filters = filters();
    let mut ctx = RunContext::new();
    ctx.seed(vec!["10.1/a".to_string()]);

    let records: Vec<_> = collector.collect(&terms, &filters, &mut ctx).collect().await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].dedup_key.value, "10.1/b");
}
