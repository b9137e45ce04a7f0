//! Integration tests for the geoblock layer with Wiremock
//!
//! Drives a Router wrapped in GeoBlockLayer against a mock geolocation API.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{routing::get, Router};
use geoblock::{Config, ConfigError, GeoBlockLayer};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const X_FORWARDED_FOR: &str = "X-Forwarded-For";
const CA: &str = "99.220.109.148";
const CH: &str = "82.220.110.18";
const PRIVATE_RANGE: &str = "192.168.1.1";
const INVALID: &str = "192.168.1.X";

/// Mock geolocation API answering like get.geojs.io's plain-text endpoint.
async fn geo_api() -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/ip/country/{}", CH)))
        .respond_with(ResponseTemplate::new(200).set_body_string("CH\n"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/ip/country/{}", CA)))
        .respond_with(ResponseTemplate::new(200).set_body_string("CA\n"))
        .mount(&mock_server)
        .await;

    mock_server
}

fn config(api: String, allow_local: bool) -> Config {
    Config {
        api,
        countries: vec!["CH".to_string()],
        allow_local_requests: allow_local,
        ..Config::default()
    }
}

fn api_for(server: &MockServer) -> String {
    format!("{}/v1/ip/country/{{ip}}", server.uri())
}

fn app(layer: GeoBlockLayer) -> Router {
    Router::new().route("/", get(|| async { "ok" })).layer(layer)
}

async fn status_for(app: Router, client_ip: &str) -> StatusCode {
    let req = Request::builder()
        .uri("http://localhost/")
        .header(X_FORWARDED_FOR, client_ip)
        .body(Body::empty())
        .unwrap();
    app.oneshot(req).await.unwrap().status()
}

// ===== Construction =====

#[test]
fn test_empty_api() {
    let cfg = config(String::new(), false);
    assert!(matches!(
        GeoBlockLayer::new(&cfg),
        Err(ConfigError::InvalidApiTemplate(_))
    ));
}

#[test]
fn test_missing_ip_in_api() {
    let cfg = config("https://get.geojs.io/v1/ip/country/".to_string(), false);
    assert!(matches!(
        GeoBlockLayer::new(&cfg),
        Err(ConfigError::InvalidApiTemplate(_))
    ));
}

#[test]
fn test_empty_allowed_country_list() {
    let mut cfg = config("https://get.geojs.io/v1/ip/country/{ip}".to_string(), false);
    cfg.countries.clear();
    assert!(matches!(
        GeoBlockLayer::new(&cfg),
        Err(ConfigError::EmptyCountryList)
    ));
}

#[test]
fn test_layer_builds_outside_runtime() {
    let mut cfg = config("https://get.geojs.io/v1/ip/country/{ip}".to_string(), false);
    cfg.cache_ttl_secs = Some(60);
    assert!(GeoBlockLayer::new(&cfg).is_ok());
}

#[tokio::test]
async fn test_dropped_layers_stop_cache_gc() {
    let metrics = tokio::runtime::Handle::current().metrics();
    let before = metrics.num_alive_tasks();

    let mut cfg = config("https://get.geojs.io/v1/ip/country/{ip}".to_string(), false);
    cfg.cache_ttl_secs = Some(60);
    for _ in 0..5 {
        let layer = GeoBlockLayer::new(&cfg).unwrap();
        drop(layer);
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(metrics.num_alive_tasks(), before);
}

// ===== Scenarios =====

#[tokio::test]
async fn test_allowed_country() {
    let server = geo_api().await;
    let layer = GeoBlockLayer::new(&config(api_for(&server), false)).unwrap();

    assert_eq!(status_for(app(layer), CH).await, StatusCode::OK);
}

#[tokio::test]
async fn test_denied_country() {
    let server = geo_api().await;
    let layer = GeoBlockLayer::new(&config(api_for(&server), false)).unwrap();

    assert_eq!(status_for(app(layer), CA).await, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_allow_local_ip() {
    let server = geo_api().await;
    let layer = GeoBlockLayer::new(&config(api_for(&server), true)).unwrap();

    assert_eq!(status_for(app(layer), PRIVATE_RANGE).await, StatusCode::OK);
    // Private addresses never reach the lookup service
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_private_ip_range() {
    let server = geo_api().await;
    let layer = GeoBlockLayer::new(&config(api_for(&server), false)).unwrap();

    assert_eq!(
        status_for(app(layer), PRIVATE_RANGE).await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_invalid_ip() {
    let server = geo_api().await;

    for allow_local in [false, true] {
        let layer = GeoBlockLayer::new(&config(api_for(&server), allow_local)).unwrap();
        assert_eq!(status_for(app(layer), INVALID).await, StatusCode::FORBIDDEN);
    }
}

// ===== Lookup Failures =====

#[tokio::test]
async fn test_lookup_server_error_denies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let layer = GeoBlockLayer::new(&config(api_for(&server), true)).unwrap();
    assert_eq!(status_for(app(layer), CH).await, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_lookup_timeout_denies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("CH")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut cfg = config(api_for(&server), false);
    cfg.api_timeout_ms = 100;
    let layer = GeoBlockLayer::new(&cfg).unwrap();

    let started = std::time::Instant::now();
    assert_eq!(status_for(app(layer), CH).await, StatusCode::FORBIDDEN);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_lookup_garbage_denies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let layer = GeoBlockLayer::new(&config(api_for(&server), false)).unwrap();
    assert_eq!(status_for(app(layer), CH).await, StatusCode::FORBIDDEN);
}

// ===== Structured Responses =====

#[tokio::test]
async fn test_json_response_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/json/{}", CH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ip": CH,
            "location": { "country_code": "ch" }
        })))
        .mount(&server)
        .await;

    let mut cfg = config(format!("{}/json/{{ip}}", server.uri()), false);
    cfg.api_response_field = Some("location.country_code".to_string());
    let layer = GeoBlockLayer::new(&cfg).unwrap();

    assert_eq!(status_for(app(layer), CH).await, StatusCode::OK);
}

// ===== Caching =====

#[tokio::test]
async fn test_cache_bounds_lookups() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/ip/country/{}", CH)))
        .respond_with(ResponseTemplate::new(200).set_body_string("CH"))
        .expect(1)
        .mount(&server)
        .await;

    let mut cfg = config(api_for(&server), false);
    cfg.cache_ttl_secs = Some(300);
    let router = app(GeoBlockLayer::new(&cfg).unwrap());

    for _ in 0..5 {
        assert_eq!(status_for(router.clone(), CH).await, StatusCode::OK);
    }
    // MockServer verifies expect(1) on drop
}

#[tokio::test]
async fn test_without_cache_each_request_looks_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/ip/country/{}", CH)))
        .respond_with(ResponseTemplate::new(200).set_body_string("CH"))
        .expect(3)
        .mount(&server)
        .await;

    let router = app(GeoBlockLayer::new(&config(api_for(&server), false)).unwrap());

    for _ in 0..3 {
        assert_eq!(status_for(router.clone(), CH).await, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_repeated_decisions_are_stable() {
    let server = geo_api().await;
    let router = app(GeoBlockLayer::new(&config(api_for(&server), false)).unwrap());

    for _ in 0..3 {
        assert_eq!(status_for(router.clone(), CH).await, StatusCode::OK);
        assert_eq!(status_for(router.clone(), CA).await, StatusCode::FORBIDDEN);
    }
}
