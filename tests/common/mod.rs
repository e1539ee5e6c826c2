//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tokio::net::TcpListener;

use service_gateway::config::{CircuitBreakerConfig, GatewayConfig, UpstreamConfig};
use service_gateway::lifecycle::{Gateway, Shutdown};
use service_gateway::registry::{RouteDefinition, RouteRegistry, ServiceEntry, ServiceRegistry};

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }

    pub fn last(&self) -> Captured {
        self.requests().pop().expect("backend received no request")
    }
}

/// Start a backend on an ephemeral port that records every request and
/// answers with `respond`.
pub async fn start_mock_backend<F>(respond: F) -> MockBackend
where
    F: Fn(&Captured) -> Response + Send + Sync + 'static,
{
    let respond = Arc::new(respond);
    start_programmable_backend(move |captured| {
        let respond = respond.clone();
        async move { respond(&captured) }
    })
    .await
}

/// Start a backend whose answer is produced asynchronously.
pub async fn start_programmable_backend<F, Fut>(respond: F) -> MockBackend
where
    F: Fn(Captured) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let log = captured.clone();
    let app = Router::new().fallback(move |request: Request<Body>| {
        let log = log.clone();
        let respond = respond.clone();
        async move {
            let (parts, body) = request.into_parts();
            let body = body.collect().await.unwrap().to_bytes();
            let request = Captured {
                method: parts.method.to_string(),
                uri: parts.uri.to_string(),
                headers: parts.headers,
                body,
            };
            log.lock().unwrap().push(request.clone());
            respond(request).await
        }
    });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend { addr, captured }
}

/// A base URL nothing is listening on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub struct TestGateway {
    pub addr: SocketAddr,
    pub gateway: Gateway,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn test_config(failure_threshold: u32, read_timeout: Duration) -> GatewayConfig {
    GatewayConfig::new(
        UpstreamConfig {
            connect_timeout_ms: 500,
            read_timeout_ms: read_timeout.as_millis() as u64,
        },
        CircuitBreakerConfig {
            failure_threshold,
            reset_timeout_ms: 60_000,
        },
    )
}

/// Serve a gateway on an ephemeral port.
pub async fn start_gateway(
    config: GatewayConfig,
    services: Vec<(&str, String)>,
    routes: Vec<RouteDefinition>,
) -> TestGateway {
    let services = services
        .into_iter()
        .map(|(name, url)| ServiceEntry::new(name, &url).unwrap())
        .collect();
    let services = Arc::new(ServiceRegistry::with_services(services).unwrap());
    let routes = Arc::new(RouteRegistry::with_routes(routes).unwrap());
    let gateway = Gateway::from_registries(&config, routes, services);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = gateway.server();
    let signalled = shutdown.signalled();
    tokio::spawn(async move {
        server.run(listener, signalled).await.unwrap();
    });

    TestGateway { addr, gateway, shutdown }
}

pub fn route(id: &str, pattern: &str, service: &str) -> RouteDefinition {
    RouteDefinition::new(id, pattern, service, Vec::new()).unwrap()
}
