//! Gateway error taxonomy and the structured error body.
//!
//! Every failure in the request pipeline is a [`GatewayError`]. It renders
//! itself as an [`ApiResponse`] JSON document, so the hosting layer never
//! sees an unhandled fault.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors produced while resolving and forwarding a request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No route rule matches the path and method.
    #[error("No route found for {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// The route points to a service absent from the registry.
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// The service's circuit is open.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Network or connection failure talking to a backend.
    #[error("Upstream request to {service} failed: {source}")]
    Transport {
        service: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The backend did not answer within the configured timeout.
    #[error("Upstream {service} timed out while {phase}")]
    Timeout { service: String, phase: &'static str },

    /// Gzip unwrap failed. Recovered inside the forwarder.
    #[error("Failed to decompress response: {0}")]
    Decompression(#[from] std::io::Error),

    /// The inbound request could not be turned into an outbound one.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal gateway error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status reported to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Transport { .. }
            | GatewayError::Timeout { .. }
            | GatewayError::Decompression(_)
            | GatewayError::InvalidRequest(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error counts against the service's circuit breaker.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, GatewayError::Transport { .. } | GatewayError::Timeout { .. })
    }

    /// Message exposed in the response body.
    ///
    /// Transport and internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::RouteNotFound { .. }
            | GatewayError::ServiceNotFound(_)
            | GatewayError::ServiceUnavailable(_) => self.to_string(),
            GatewayError::Transport { .. } | GatewayError::Timeout { .. } => {
                "Upstream request failed".to_string()
            }
            _ => "Internal gateway error".to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiResponse::<()>::failure(self.public_message());
        (status, [(header::CACHE_CONTROL, "no-store")], Json(body)).into_response()
    }
}

/// Envelope used for gateway-generated JSON bodies.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: now_rfc3339(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            timestamp: now_rfc3339(),
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
