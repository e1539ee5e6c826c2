//! Route lookup.
//!
//! # Responsibilities
//! - Scan the current route list in order
//! - Return the first rule whose pattern and method both match
//! - Return an explicit `RouteNotFound` rather than a silent default
//!
//! # Design Decisions
//! - First match wins; configuration order is the only tie-break
//! - No specificity scoring
//! - O(n) scan over a snapshot (acceptable for typical route counts)

use std::sync::Arc;

use crate::error::GatewayError;
use crate::registry::{RouteDefinition, RouteRegistry};

/// Resolves inbound requests to route rules.
#[derive(Debug, Clone)]
pub struct RequestRouter {
    routes: Arc<RouteRegistry>,
}

impl RequestRouter {
    pub fn new(routes: Arc<RouteRegistry>) -> Self {
        Self { routes }
    }

    /// Find the first route matching `path` and `method`.
    pub fn resolve(&self, path: &str, method: &str) -> Result<RouteDefinition, GatewayError> {
        let routes = self.routes.all_routes();
        routes
            .iter()
            .find(|route| route.pattern.matches(path) && route.allows_method(method))
            .cloned()
            .ok_or_else(|| GatewayError::RouteNotFound {
                method: method.to_string(),
                path: path.to_string(),
            })
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.routes
    }
}
