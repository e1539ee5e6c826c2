//! Service gateway library.
//!
//! Routes inbound HTTP requests to named backend services by first-match
//! path pattern, forwards them, unwraps gzip responses, and guards each
//! service with a circuit breaker.

pub mod admin;
pub mod config;
pub mod error;
pub mod forwarding;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod routing;

pub use config::GatewayConfig;
pub use error::{ApiResponse, GatewayError};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
