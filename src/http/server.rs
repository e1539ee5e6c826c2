//! HTTP server setup and the gateway handler.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (request ID, tracing)
//! - Resolve each request to a route and hand it to the forwarder
//! - Serve until the shutdown future completes

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::forwarding::RequestForwarder;
use crate::http::request::{request_id, GatewayRequestId, X_REQUEST_ID};
use crate::observability::metrics;
use crate::routing::RequestRouter;

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub router: Arc<RequestRouter>,
    pub forwarder: Arc<RequestForwarder>,
}

impl AppState {
    pub fn new(router: RequestRouter, forwarder: RequestForwarder) -> Self {
        Self {
            router: Arc::new(router),
            forwarder: Arc::new(forwarder),
        }
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The inbound body limit is enforced by the forwarder, so an oversized
    /// body still gets a logged, counted JSON error response.
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, GatewayRequestId))
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight
    /// requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

/// Resolves the route, forwards, and relays the outcome.
///
/// Every failure is rendered as a JSON error body; nothing escapes to the
/// hosting layer.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    tracing::info!(request_id = %request_id, method = %method, path = %path, "Request received");

    let route = match state.router.resolve(&path, &method) {
        Ok(route) => route,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "No route matched");
            let response = e.into_response();
            metrics::record_request(&method, response.status().as_u16(), "none", start);
            return response;
        }
    };

    tracing::info!(
        request_id = %request_id,
        route = %route.id,
        service = %route.service_name,
        "Route matched"
    );

    let response = state.forwarder.forward(&route, request).await.into_response();
    let status = response.status().as_u16();
    metrics::record_request(&method, status, &route.service_name, start);

    tracing::info!(
        request_id = %request_id,
        status = status,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );
    response
}
