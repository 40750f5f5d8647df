//! HTTP adapters against a local mock server.

use httpmock::prelude::*;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde_json::json;
use std::time::Duration;

use skinscout::config::ScannerConfig;
use skinscout::feed::csfloat::CsfloatTransport;
use skinscout::feed::{FeedError, FeedTransport, PageRequest};
use skinscout::pricing::csprices::CspricesSource;
use skinscout::pricing::{PriceLookupError, PriceSource};

use crate::mock_feed::listing_json;

fn transport(server: &MockServer) -> CsfloatTransport {
    CsfloatTransport::new(
        server.url("/api/v1/listings"),
        SecretString::new("test-key".into()),
        Duration::from_secs(5),
        "skinscout-test",
    )
    .unwrap()
}

fn price_source(server: &MockServer) -> CspricesSource {
    CspricesSource::new(server.url("/api/v1/prices"), Duration::from_secs(5), "skinscout-test")
        .unwrap()
}

// ---------------------------------------------------------------------------
// CSFloat listings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_listing_page_request_and_decode() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/listings")
                .header("Authorization", "test-key")
                .query_param("sort_by", "most_recent")
                .query_param("type", "buy_now")
                .query_param("limit", "50")
                .query_param("min_price", "50")
                .query_param("max_price", "20000")
                .query_param("cursor", "abc");
            then.status(200).json_body(json!({
                "data": [
                    listing_json("1", "AK-47 | Redline (Field-Tested)", 4000, 5000),
                    { "price": 100 },
                ],
                "cursor": "def",
            }));
        })
        .await;

    let request = PageRequest::first(&ScannerConfig::default()).with_cursor("abc".into());
    let page = transport(&server).fetch_page(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(page.listings.len(), 1);
    assert_eq!(page.listings[0].id, "1");
    assert_eq!(page.listings[0].base_price(), dec!(50));
    assert_eq!(page.skipped, 1);
    assert_eq!(page.cursor.as_deref(), Some("def"));
}

#[tokio::test]
async fn test_listing_status_mapping() {
    let cases = [(429, "rate"), (403, "forbidden"), (500, "status")];
    for (status, kind) in cases {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/listings");
                then.status(status).body("nope");
            })
            .await;

        let request = PageRequest::first(&ScannerConfig::default());
        let err = transport(&server).fetch_page(&request).await.unwrap_err();
        match kind {
            "rate" => assert!(matches!(err, FeedError::RateLimited)),
            "forbidden" => assert!(matches!(err, FeedError::Forbidden)),
            _ => assert!(matches!(err, FeedError::Status { status: 500, .. })),
        }
    }
}

#[tokio::test]
async fn test_listing_malformed_envelope() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/listings");
            then.status(200).json_body(json!({ "listings": [] }));
        })
        .await;

    let request = PageRequest::first(&ScannerConfig::default());
    let err = transport(&server).fetch_page(&request).await.unwrap_err();
    assert!(matches!(err, FeedError::MalformedEnvelope(_)));
}

#[tokio::test]
async fn test_listing_non_json_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/listings");
            then.status(200).body("<html>maintenance</html>");
        })
        .await;

    let request = PageRequest::first(&ScannerConfig::default());
    let err = transport(&server).fetch_page(&request).await.unwrap_err();
    assert!(matches!(err, FeedError::MalformedEnvelope(_)));
}

// ---------------------------------------------------------------------------
// csprices lookups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_price_lookup_string_price() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path_contains("/api/v1/prices/")
                .path_contains("Redline");
            then.status(200)
                .json_body(json!({ "success": true, "price": "12.34" }));
        })
        .await;

    let price = price_source(&server)
        .lookup("AK-47 | Redline (Minimal Wear)")
        .await
        .unwrap();
    assert_eq!(price, dec!(12.34));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_price_lookup_numeric_price() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/api/v1/prices/");
            then.status(200).json_body(json!({ "success": true, "price": 7.5 }));
        })
        .await;

    let price = price_source(&server).lookup("AWP | Asiimov (Field-Tested)").await.unwrap();
    assert_eq!(price, dec!(7.5));
}

#[tokio::test]
async fn test_price_lookup_failures() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("Unsuccessful");
            then.status(200).json_body(json!({ "success": false }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("Missing");
            then.status(404);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("Garbled");
            then.status(200).body("not json");
        })
        .await;

    let source = price_source(&server);
    assert!(matches!(
        source.lookup("Unsuccessful").await,
        Err(PriceLookupError::Unsuccessful)
    ));
    assert!(matches!(
        source.lookup("Missing").await,
        Err(PriceLookupError::Status(404))
    ));
    assert!(matches!(
        source.lookup("Garbled").await,
        Err(PriceLookupError::Malformed(_))
    ));
}
