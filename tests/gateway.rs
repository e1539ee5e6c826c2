//! End-to-end tests: client → gateway → mock backend.

use std::io::Write;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use flate2::{write::GzEncoder, Compression};
use serde_json::Value;

use service_gateway::registry::RouteDefinition;
use service_gateway::resilience::State;

mod common;

use common::{refused_url, route, start_gateway, start_mock_backend, start_programmable_backend, test_config};

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn ok(body: &'static str) -> Response {
    (StatusCode::OK, body).into_response()
}

#[tokio::test]
async fn test_forwards_path_and_query() {
    let backend = start_mock_backend(|_| ok("order 42")).await;
    let gw = start_gateway(
        test_config(3, Duration::from_secs(2)),
        vec![("orders-svc", backend.url())],
        vec![route("r1", "/orders/**", "orders-svc")],
    )
    .await;

    let res = reqwest::get(gw.url("/orders/42?x=1&y=a%20b")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "order 42");

    let seen = backend.last();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.uri, "/orders/42?x=1&y=a%20b");
}

#[tokio::test]
async fn test_headers_copied_except_host() {
    let backend = start_mock_backend(|_| ok("")).await;
    let gw = start_gateway(
        test_config(3, Duration::from_secs(2)),
        vec![("orders-svc", backend.url())],
        vec![route("r1", "/**", "orders-svc")],
    )
    .await;

    let client = reqwest::Client::new();
    client
        .get(gw.url("/anything"))
        .header("x-custom", "Mixed Case Value")
        .header(header::AUTHORIZATION, "Bearer t0ken")
        .send()
        .await
        .unwrap();

    let seen = backend.last();
    assert_eq!(seen.headers.get("x-custom").unwrap(), "Mixed Case Value");
    assert_eq!(seen.headers.get(header::AUTHORIZATION).unwrap(), "Bearer t0ken");
    // The outbound client derives Host from the target URL.
    assert_eq!(seen.headers.get(header::HOST).unwrap(), &backend.addr.to_string());
}

#[tokio::test]
async fn test_request_body_passes_through() {
    let backend = start_mock_backend(|_| (StatusCode::CREATED, "created").into_response()).await;
    let gw = start_gateway(
        test_config(3, Duration::from_secs(2)),
        vec![("orders-svc", backend.url())],
        vec![route("r1", "/orders/**", "orders-svc")],
    )
    .await;

    let payload = vec![0xffu8, 0x00, b'{', b'}', 0xfe];
    // `/orders/**` also matches `/orders` itself.
    let res = reqwest::Client::new()
        .post(gw.url("/orders"))
        .body(payload.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    let seen = backend.last();
    assert_eq!(seen.method, "POST");
    assert_eq!(&seen.body[..], &payload[..]);
}

#[tokio::test]
async fn test_status_and_headers_relayed() {
    let backend = start_mock_backend(|_| {
        (StatusCode::IM_A_TEAPOT, [("x-backend", "orders")], "short and stout").into_response()
    })
    .await;
    let gw = start_gateway(
        test_config(3, Duration::from_secs(2)),
        vec![("orders-svc", backend.url())],
        vec![route("r1", "/**", "orders-svc")],
    )
    .await;

    let res = reqwest::get(gw.url("/pot")).await.unwrap();
    assert_eq!(res.status(), 418);
    assert_eq!(res.headers().get("x-backend").unwrap(), "orders");
    assert_eq!(res.text().await.unwrap(), "short and stout");
}

#[tokio::test]
async fn test_gzip_body_is_unwrapped() {
    let compressed = gzip(br#"{"status":"ok"}"#);
    let backend = start_mock_backend(move |_| {
        (
            StatusCode::OK,
            [(header::CONTENT_ENCODING, "gzip"), (header::CONTENT_TYPE, "application/json")],
            compressed.clone(),
        )
            .into_response()
    })
    .await;
    let gw = start_gateway(
        test_config(3, Duration::from_secs(2)),
        vec![("orders-svc", backend.url())],
        vec![route("r1", "/**", "orders-svc")],
    )
    .await;

    let res = reqwest::get(gw.url("/status")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().get(header::CONTENT_ENCODING).is_none());
    assert_eq!(res.headers().get(header::CONTENT_TYPE).unwrap(), "application/json");
    assert_eq!(res.text().await.unwrap(), r#"{"status":"ok"}"#);
}

#[tokio::test]
async fn test_malformed_gzip_relayed_unchanged() {
    let backend = start_mock_backend(|_| {
        (StatusCode::OK, [(header::CONTENT_ENCODING, "gzip")], "definitely not gzip").into_response()
    })
    .await;
    let gw = start_gateway(
        test_config(3, Duration::from_secs(2)),
        vec![("orders-svc", backend.url())],
        vec![route("r1", "/**", "orders-svc")],
    )
    .await;

    let res = reqwest::get(gw.url("/status")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers().get(header::CONTENT_ENCODING).unwrap(), "gzip");
    assert_eq!(&res.bytes().await.unwrap()[..], b"definitely not gzip");
}

#[tokio::test]
async fn test_welcome_and_missing_routes() {
    let gw = start_gateway(
        test_config(3, Duration::from_secs(2)),
        Vec::new(),
        vec![
            route("home", "/", "welcome"),
            route("r1", "/orders/**", "orders-svc"),
        ],
    )
    .await;

    let res = reqwest::get(gw.url("/")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "Welcome to the Service Gateway");

    let res = reqwest::get(gw.url("/nowhere")).await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("No route found"));

    let res = reqwest::get(gw.url("/orders/1")).await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Service not found: orders-svc");
}

#[tokio::test]
async fn test_method_restricted_route() {
    let backend = start_mock_backend(|_| ok("profile")).await;
    let gw = start_gateway(
        test_config(3, Duration::from_secs(2)),
        vec![("users-svc", backend.url())],
        vec![RouteDefinition::new("profile", "/users/*/profile", "users-svc", vec!["GET".into()]).unwrap()],
    )
    .await;

    let client = reqwest::Client::new();
    let res = client.get(gw.url("/users/7/profile")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let res = client.delete(gw.url("/users/7/profile")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn test_transport_failures_open_circuit() {
    let gw = start_gateway(
        test_config(2, Duration::from_secs(2)),
        vec![("orders-svc", refused_url().await)],
        vec![route("r1", "/**", "orders-svc")],
    )
    .await;

    for _ in 0..2 {
        let res = reqwest::get(gw.url("/orders")).await.unwrap();
        assert_eq!(res.status(), 500);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Upstream request failed");
    }
    assert_eq!(gw.gateway.breaker.state("orders-svc"), Some(State::Open));

    let res = reqwest::get(gw.url("/orders")).await.unwrap();
    assert_eq!(res.status(), 503);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Service unavailable: orders-svc");
}

#[tokio::test]
async fn test_backend_errors_do_not_trip_circuit() {
    let backend = start_mock_backend(|_| (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()).await;
    let gw = start_gateway(
        test_config(1, Duration::from_secs(2)),
        vec![("orders-svc", backend.url())],
        vec![route("r1", "/**", "orders-svc")],
    )
    .await;

    for _ in 0..3 {
        let res = reqwest::get(gw.url("/orders")).await.unwrap();
        assert_eq!(res.status(), 500);
        assert_eq!(res.text().await.unwrap(), "boom");
    }
    assert_eq!(gw.gateway.breaker.state("orders-svc"), Some(State::Closed));
    assert_eq!(backend.requests().len(), 3);
}

#[tokio::test]
async fn test_read_timeout_counts_as_failure() {
    let backend = start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        ok("too late")
    })
    .await;
    let gw = start_gateway(
        test_config(1, Duration::from_millis(200)),
        vec![("slow-svc", backend.url())],
        vec![route("r1", "/**", "slow-svc")],
    )
    .await;

    let res = reqwest::get(gw.url("/slow")).await.unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(gw.gateway.breaker.state("slow-svc"), Some(State::Open));
}

#[tokio::test]
async fn test_circuits_are_per_service() {
    let healthy = start_mock_backend(|_| ok("fine")).await;
    let gw = start_gateway(
        test_config(1, Duration::from_secs(2)),
        vec![("down-svc", refused_url().await), ("up-svc", healthy.url())],
        vec![route("down", "/down/**", "down-svc"), route("up", "/up/**", "up-svc")],
    )
    .await;

    assert_eq!(reqwest::get(gw.url("/down/x")).await.unwrap().status(), 500);
    assert_eq!(reqwest::get(gw.url("/down/x")).await.unwrap().status(), 503);

    let res = reqwest::get(gw.url("/up/x")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "fine");
}

#[tokio::test]
async fn test_oversized_request_body_rejected_with_json() {
    let backend = start_mock_backend(|_| ok("should not be reached")).await;
    let mut config = test_config(1, Duration::from_secs(2));
    config.listener.max_body_bytes = 16;
    let gw = start_gateway(
        config,
        vec![("orders-svc", backend.url())],
        vec![route("r1", "/**", "orders-svc")],
    )
    .await;

    let res = reqwest::Client::new()
        .post(gw.url("/orders"))
        .body(vec![b'x'; 100])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.headers().get(header::CONTENT_TYPE).unwrap(), "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Internal gateway error");
    assert!(body["timestamp"].is_string());

    assert!(backend.requests().is_empty());
    assert_eq!(gw.gateway.breaker.state("orders-svc"), Some(State::Closed));
}

#[tokio::test]
async fn test_gzip_expanding_past_limit_relayed_encoded() {
    let compressed = gzip(&vec![b'a'; 8 * 1024 * 1024]);
    let expected = compressed.clone();
    let backend = start_mock_backend(move |_| {
        (StatusCode::OK, [(header::CONTENT_ENCODING, "gzip")], compressed.clone()).into_response()
    })
    .await;
    let mut config = test_config(3, Duration::from_secs(2));
    config.listener.max_body_bytes = 64 * 1024;
    let gw = start_gateway(
        config,
        vec![("orders-svc", backend.url())],
        vec![route("r1", "/**", "orders-svc")],
    )
    .await;

    let res = reqwest::get(gw.url("/export")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers().get(header::CONTENT_ENCODING).unwrap(), "gzip");
    let body = res.bytes().await.unwrap();
    assert_eq!(body.len(), expected.len());
    assert_eq!(&body[..], &expected[..]);
}
