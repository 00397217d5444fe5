mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use crypto_dashboard::routers::create_routes;
use crypto_dashboard::AppState;

use common::*;

async fn get(state: AppState, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = create_routes(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, body.to_vec())
}

fn offline_state() -> AppState {
    let h = harness(FakeMarket::default(), FakeSearch::failing(), FakeGenerator::new(None, None));
    AppState { dashboard: h.dashboard }
}

#[tokio::test]
async fn test_chart_endpoint_without_history_returns_500() {
    for uri in ["/chart-data/BTC", "/api/chart/BTC"] {
        let (status, body) = get(offline_state(), uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Failed to fetch historical data");
    }
}

#[tokio::test]
async fn test_chart_endpoint_returns_series() {
    let market = FakeMarket::default();
    *market.history.lock().unwrap() = vec![point(1_704_153_600, 43000.0), point(1_704_067_200, 42000.0)];
    let h = harness(market, FakeSearch::failing(), FakeGenerator::new(None, None));

    let (status, body) = get(AppState { dashboard: h.dashboard }, "/chart-data/eth").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["labels"], serde_json::json!(["2024-01-01", "2024-01-02"]));
    assert_eq!(json["datasets"][0]["data"], serde_json::json!([42000.0, 43000.0]));
    assert_eq!(json["datasets"][0]["label"], "ETH Price (USD)");
    assert_eq!(json["datasets"][0]["borderColor"], "rgba(54, 162, 235, 1)");
}

#[tokio::test]
async fn test_index_degrades_to_placeholders() {
    let (status, body) = get(offline_state(), "/?coin=eth&category=regulation").await;
    assert_eq!(status, StatusCode::OK);

    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("ETH Analysis"));
    assert!(html.contains("N/A"));
    assert!(html.contains("Price data for ETH is currently unavailable."));
    assert!(html.contains("No news available right now."));
    assert!(html.contains("fetch(\"/chart-data/ETH\")"));
}

#[tokio::test]
async fn test_index_encodes_unusual_coin_in_urls() {
    let (status, body) = get(offline_state(), "/?coin=a%26b%2Fc").await;
    assert_eq!(status, StatusCode::OK);

    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("fetch(\"/chart-data/A%26B%2FC\")"));
    assert!(html.contains("A&amp;B/C Analysis"));
}

#[tokio::test]
async fn test_dashboard_json_defaults() {
    let h = harness(
        FakeMarket::with_prices(vec![snapshot("BTC", 67000.0, 68000.0, 66000.0)]),
        FakeSearch::returning("Headline - body | Source"),
        FakeGenerator::new(Some("not json"), Some("positive")),
    );

    let (status, body) = get(AppState { dashboard: h.dashboard }, "/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["coin"], "BTC");
    assert_eq!(json["category"], "market");
    assert_eq!(json["analysis"]["kind"], "structured");
    assert_eq!(json["analysis"]["fallback"], true);
    assert_eq!(json["analysis"]["support"], 66000.0);
    assert_eq!(json["analysis"]["resistance"], 68000.0);
    assert_eq!(json["news"][0]["sentiment"], "positive");
    assert_eq!(json["news"][0]["source"], "Source");
}

#[tokio::test]
async fn test_health_and_status() {
    let (status, body) = get(offline_state(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");

    let (status, body) = get(offline_state(), "/status").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["symbols"], serde_json::json!(["BTC", "ETH"]));
    assert_eq!(json["analysis_mode"], "structured");
}
