//! Shared fixtures for the mock-server tests.
#![allow(dead_code)]

use serde_json::{Value, json};
use wiremock::MockServer;

use venue_harvest::config::Config;

/// Path of the bulk search endpoint under `Config::for_testing`.
pub const BULK_PATH: &str = "/graph/v1/paper/search/bulk";

pub fn test_config(server: &MockServer) -> Config {
    Config::for_testing(&server.uri())
}

/// Search record carrying the given external ids.
pub fn paper_json(id: &str, title: &str, external_ids: Value) -> Value {
    json!({
        "paperId": id,
        "title": title,
        "abstract": format!("Abstract for {title}"),
        "year": 2023,
        "venue": "Interspeech",
        "url": format!("https://www.semanticscholar.org/paper/{id}"),
        "authors": [{"authorId": "1", "name": "Ada Lovelace"}, {"authorId": "2", "name": "Alan Turing"}],
        "openAccessPdf": null,
        "externalIds": external_ids
    })
}

pub fn doi_paper(id: &str, doi: &str) -> Value {
    paper_json(id, &format!("Paper {id}"), json!({"DOI": doi, "CorpusId": 1000}))
}

pub fn arxiv_paper(id: &str, arxiv: &str) -> Value {
    paper_json(id, &format!("Paper {id}"), json!({"ArXiv": arxiv, "CorpusId": 2000}))
}

/// One bulk search page.
pub fn page(papers: Vec<Value>, token: Option<&str>) -> Value {
    let mut body = json!({ "total": 42, "data": papers });
    if let Some(token) = token {
        body["token"] = json!(token);
    }
    body
}

/// Handle API answer pointing `doi` at `url`.
pub fn handle_record(doi: &str, url: &str) -> Value {
    json!({
        "responseCode": 1,
        "handle": doi,
        "values": [
            {"index": 100, "type": "HS_ADMIN", "data": {"format": "admin", "value": {"handle": "0.NA/10.21437", "index": 200}}},
            {"index": 1, "type": "URL", "data": {"format": "string", "value": url}, "ttl": 86400}
        ]
    })
}
