//! Service and route registries.
//!
//! # Data Flow
//! ```text
//! services.json → loader.rs → ServiceRegistry (name → base URL)
//! routes.json   → loader.rs → RouteRegistry   (ordered rules)
//!
//! Per request:
//!     RequestRouter reads RouteRegistry snapshot
//!     RequestForwarder reads ServiceRegistry snapshot
//! ```
//!
//! # Design Decisions
//! - Owned structures injected at construction, never global statics
//! - Loads are all-or-nothing, installed with a single atomic swap
//! - A route may reference an unregistered service; that surfaces as
//!   `ServiceNotFound` per request, not as a load error

pub mod loader;
pub mod route;
pub mod service;

pub use loader::{load_route_file, load_service_file, unresolved_routes};
pub use route::{RouteDefinition, RouteRecord, RouteRegistry, WELCOME_SERVICE};
pub use service::{ServiceEntry, ServiceRegistry};

use crate::routing::matcher::PatternError;

/// Errors raised while loading registry contents.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("route '{route}' has an invalid pattern: {source}")]
    InvalidPattern {
        route: String,
        #[source]
        source: PatternError,
    },

    #[error("route '{route}' has an invalid method '{method}'")]
    InvalidMethod { route: String, method: String },

    #[error("duplicate route id '{0}'")]
    DuplicateRoute(String),

    #[error("service '{service}' has an invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        service: String,
        url: String,
        reason: String,
    },

    #[error("duplicate service name '{0}'")]
    DuplicateService(String),
}
