//! Wiremock integration tests for TronaldDumpClient.
#![cfg(feature = "tronald")]

use std::sync::Arc;

use mimir::{MimirError, QuoteSource, SequenceRandom, TronaldDumpClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn hal_quote(id: &str, value: &str, tags: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "quote_id": id,
        "value": value,
        "tags": tags,
        "appeared_at": "2016-01-01T00:00:00.000Z",
        "_embedded": {
            "author": [{"author_id": "a1", "name": "Donald Trump"}],
            "source": [{"url": format!("https://twitter.com/status/{id}")}]
        }
    })
}

/// Test successful random quote request.
#[tokio::test]
async fn test_random_quote_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/random/quote"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(hal_quote("q1", "Big league.", &["Economy"])),
        )
        .mount(&mock_server)
        .await;

    let client = TronaldDumpClient::with_base_url(mock_server.uri());
    let quote = client.download_one(None).await.expect("should succeed");

    assert_eq!(quote.id, "q1");
    assert_eq!(quote.text, "Big league.");
    assert_eq!(quote.tags, vec!["Economy".to_string()]);
    assert_eq!(quote.author.as_deref(), Some("Donald Trump"));
    assert_eq!(
        quote.source_url.as_deref(),
        Some("https://twitter.com/status/q1")
    );
}

/// Test tagged download picks among search results.
#[tokio::test]
async fn test_tagged_quote_from_search() {
    let mock_server = MockServer::start().await;

    let page = serde_json::json!({
        "count": 2,
        "total": 2,
        "_embedded": {
            "quotes": [
                hal_quote("q1", "first", &["Hillary Clinton"]),
                hal_quote("q2", "second", &["Hillary Clinton"]),
            ]
        }
    });
    Mock::given(method("GET"))
        .and(path("/search/quote"))
        .and(query_param("tag", "Hillary Clinton"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page))
        .mount(&mock_server)
        .await;

    let client = TronaldDumpClient::with_base_url(mock_server.uri())
        .with_random(Arc::new(SequenceRandom::new([1])));
    let quote = client
        .download_one(Some("Hillary Clinton"))
        .await
        .expect("should succeed");
    assert_eq!(quote.id, "q2");

    let all = client
        .download_many(Some("Hillary Clinton"))
        .await
        .expect("should succeed");
    assert_eq!(all.len(), 2);
}

/// Test a search with no hits.
#[tokio::test]
async fn test_tagged_quote_without_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/quote"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"count": 0, "total": 0})),
        )
        .mount(&mock_server)
        .await;

    let client = TronaldDumpClient::with_base_url(mock_server.uri());
    let err = client.download_one(Some("Nobody")).await.unwrap_err();
    assert!(matches!(err, MimirError::EmptyResponse));

    let none = client.download_many(Some("Nobody")).await.unwrap();
    assert!(none.is_empty());
}

/// Test the tag listing.
#[tokio::test]
async fn test_list_tags() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tag"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 2,
            "total": 2,
            "_embedded": {"tag": ["Barack Obama", "Hillary Clinton"]}
        })))
        .mount(&mock_server)
        .await;

    let client = TronaldDumpClient::with_base_url(mock_server.uri());
    let tags = client.list_tags().await.unwrap();
    assert_eq!(tags, vec!["Barack Obama", "Hillary Clinton"]);
}

/// Test empty tag is rejected before any request.
#[tokio::test]
async fn test_empty_tag_rejected() {
    let mock_server = MockServer::start().await;

    let client = TronaldDumpClient::with_base_url(mock_server.uri());
    let err = client.search_by_tag("").await.unwrap_err();
    assert!(matches!(err, MimirError::InvalidArgument(_)));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

/// Test 404 maps to a permanent Api error.
#[tokio::test]
async fn test_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such quote"))
        .mount(&mock_server)
        .await;

    let client = TronaldDumpClient::with_base_url(mock_server.uri());
    let err = client.random_quote().await.unwrap_err();
    match &err {
        MimirError::Api { status, message } => {
            assert_eq!(*status, 404);
            assert_eq!(message, "no such quote");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(!err.is_transient());
}

/// Test a connection failure surfaces as a transient Http error.
#[tokio::test]
async fn test_connection_refused() {
    let client = TronaldDumpClient::with_base_url("http://127.0.0.1:1");
    let err = client.random_quote().await.unwrap_err();
    assert!(matches!(err, MimirError::Http(_)));
    assert!(err.is_transient());
}
