//! The request forwarder.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Uri};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::forwarding::client::UpstreamClient;
use crate::forwarding::request::{build_target_url, copy_request_headers, read_inbound_body};
use crate::forwarding::response::OutboundResponse;
use crate::observability::metrics;
use crate::registry::{RouteDefinition, ServiceEntry, ServiceRegistry};
use crate::resilience::CircuitBreaker;

/// Forwards resolved requests to their backend service.
#[derive(Debug, Clone)]
pub struct RequestForwarder {
    services: Arc<ServiceRegistry>,
    breaker: Arc<CircuitBreaker>,
    client: UpstreamClient,
    max_body_bytes: usize,
}

impl RequestForwarder {
    pub fn new(
        services: Arc<ServiceRegistry>,
        breaker: Arc<CircuitBreaker>,
        client: UpstreamClient,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            services,
            breaker,
            client,
            max_body_bytes,
        }
    }

    /// Build a forwarder with a client configured from `config`.
    pub fn from_config(config: &GatewayConfig, services: Arc<ServiceRegistry>, breaker: Arc<CircuitBreaker>) -> Self {
        let client = UpstreamClient::new(&config.upstream, config.listener.max_body_bytes);
        Self::new(services, breaker, client, config.listener.max_body_bytes)
    }

    /// Forward `request` along `route`.
    ///
    /// The `welcome` route is answered locally. Otherwise the circuit is
    /// checked before any I/O, and the outcome of the call is recorded:
    /// only a transport failure counts against the circuit, whatever
    /// status the backend returned.
    pub async fn forward(&self, route: &RouteDefinition, request: Request<Body>) -> Result<OutboundResponse, GatewayError> {
        if route.is_welcome() {
            return Ok(OutboundResponse::welcome());
        }

        let service = route.service_name.as_str();
        if !self.breaker.is_available(service) {
            tracing::warn!(service = %service, route = %route.id, "Circuit open, rejecting request");
            return Err(GatewayError::ServiceUnavailable(service.to_string()));
        }

        let entry = self.services.lookup(service)?;
        let outbound = self.build_outbound(&entry, request).await?;

        tracing::info!(
            service = %service,
            method = %outbound.method(),
            target_url = %outbound.uri(),
            "Forwarding request"
        );

        match self.client.execute(service, outbound).await {
            Ok(response) => {
                self.breaker.record_success(service);
                Ok(response.decode_gzip(self.max_body_bytes))
            }
            Err(e) if e.is_transport_failure() => {
                tracing::error!(service = %service, error = %e, "Upstream transport failure");
                self.breaker.record_failure(service);
                metrics::record_upstream_failure(service);
                Err(e)
            }
            Err(e) => {
                // The backend answered; the failure is ours.
                self.breaker.record_success(service);
                tracing::error!(service = %service, error = %e, "Failed to relay upstream response");
                Err(e)
            }
        }
    }

    async fn build_outbound(&self, entry: &ServiceEntry, request: Request<Body>) -> Result<Request<Body>, GatewayError> {
        let (parts, body) = request.into_parts();

        let target_url = build_target_url(&entry.base_url, &parts.uri);
        let uri: Uri = target_url
            .parse()
            .map_err(|e| GatewayError::InvalidRequest(format!("invalid target URL '{}': {}", target_url, e)))?;

        let headers = copy_request_headers(&parts.headers);
        let body = read_inbound_body(&parts.headers, body, self.max_body_bytes).await?;

        let mut outbound = Request::new(Body::from(body));
        *outbound.method_mut() = parts.method;
        *outbound.uri_mut() = uri;
        *outbound.headers_mut() = headers;
        Ok(outbound)
    }

    pub fn services(&self) -> &Arc<ServiceRegistry> {
        &self.services
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}
