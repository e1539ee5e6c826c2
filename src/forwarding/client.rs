//! Outbound HTTP client with connect and read timeouts.

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::config::UpstreamConfig;
use crate::error::GatewayError;
use crate::forwarding::response::OutboundResponse;

/// Shared client for all backends.
///
/// The connect timeout lives on the connector. The read timeout bounds
/// waiting for the response head, then separately bounds receiving the body.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
    read_timeout: Duration,
    max_body_bytes: usize,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig, max_body_bytes: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.connect_timeout()));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            read_timeout: config.read_timeout(),
            max_body_bytes,
        }
    }

    /// Execute `request` against `service` and buffer the whole response.
    ///
    /// Only `Transport` and `Timeout` errors mean the backend was not
    /// reached; any other error happened after a completed exchange.
    pub async fn execute(&self, service: &str, request: Request<Body>) -> Result<OutboundResponse, GatewayError> {
        let response: hyper::Response<Incoming> = match time::timeout(self.read_timeout, self.client.request(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(GatewayError::Transport {
                    service: service.to_string(),
                    source: Box::new(e),
                })
            }
            Err(_) => {
                return Err(GatewayError::Timeout {
                    service: service.to_string(),
                    phase: "waiting for response headers",
                })
            }
        };

        let (parts, body) = response.into_parts();
        let collected = time::timeout(self.read_timeout, Limited::new(body, self.max_body_bytes).collect()).await;

        let bytes = match collected {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
                return Err(GatewayError::Internal(format!(
                    "response from {} exceeds {} bytes",
                    service, self.max_body_bytes
                )))
            }
            Ok(Err(e)) => {
                return Err(GatewayError::Transport {
                    service: service.to_string(),
                    source: e,
                })
            }
            Err(_) => {
                return Err(GatewayError::Timeout {
                    service: service.to_string(),
                    phase: "reading response body",
                })
            }
        };

        Ok(OutboundResponse::from_upstream(parts.status, parts.headers, bytes))
    }
}
