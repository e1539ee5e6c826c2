//! Route registry.
//!
//! # Responsibilities
//! - Hold the ordered list of route rules
//! - Replace the whole list atomically on load
//!
//! # Design Decisions
//! - Copy-on-write via `ArcSwap`: readers take a snapshot of the current
//!   list and never see a partially installed one
//! - Insertion order is evaluation order; nothing is sorted
//! - Every record is validated before anything is installed

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::Method;
use serde::{Deserialize, Serialize, Serializer};

use crate::registry::RegistryError;
use crate::routing::matcher::PathPattern;

/// Service name that makes the gateway answer locally.
pub const WELCOME_SERVICE: &str = "welcome";

/// A route record as it appears in `routes.json`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteRecord {
    pub id: String,
    #[serde(rename = "pathPattern", alias = "path")]
    pub path_pattern: String,
    #[serde(rename = "serviceName")]
    pub service_name: String,
    #[serde(default)]
    pub methods: Option<Vec<String>>,
}

/// A validated route rule.
#[derive(Debug, Clone, Serialize)]
pub struct RouteDefinition {
    pub id: String,
    #[serde(rename = "pathPattern", serialize_with = "serialize_pattern")]
    pub pattern: PathPattern,
    #[serde(rename = "serviceName")]
    pub service_name: String,
    /// Allowed methods; empty matches any method.
    pub methods: Vec<String>,
}

fn serialize_pattern<S: Serializer>(pattern: &PathPattern, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(pattern.as_str())
}

impl RouteDefinition {
    /// Build a route from parts, validating the pattern and methods.
    pub fn new(
        id: impl Into<String>,
        path_pattern: &str,
        service_name: impl Into<String>,
        methods: Vec<String>,
    ) -> Result<Self, RegistryError> {
        let id = id.into();
        let pattern = PathPattern::parse(path_pattern).map_err(|source| RegistryError::InvalidPattern {
            route: id.clone(),
            source,
        })?;

        for method in &methods {
            if Method::from_bytes(method.as_bytes()).is_err() {
                return Err(RegistryError::InvalidMethod {
                    route: id,
                    method: method.clone(),
                });
            }
        }

        Ok(Self {
            id,
            pattern,
            service_name: service_name.into(),
            methods,
        })
    }

    /// Whether the method set admits `method` (exact string comparison).
    pub fn allows_method(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.iter().any(|m| m == method)
    }

    /// Whether requests on this route are answered by the gateway itself.
    pub fn is_welcome(&self) -> bool {
        self.service_name == WELCOME_SERVICE
    }
}

impl TryFrom<RouteRecord> for RouteDefinition {
    type Error = RegistryError;

    fn try_from(record: RouteRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.id,
            &record.path_pattern,
            record.service_name,
            record.methods.unwrap_or_default(),
        )
    }
}

/// Ordered, atomically replaceable set of routes.
#[derive(Debug)]
pub struct RouteRegistry {
    routes: ArcSwap<Vec<RouteDefinition>>,
}

impl RouteRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            routes: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Create a registry already holding `definitions`.
    pub fn with_routes(definitions: Vec<RouteDefinition>) -> Result<Self, RegistryError> {
        let registry = Self::new();
        registry.load(definitions)?;
        Ok(registry)
    }

    /// Replace the route list. Fails without changing anything if two
    /// routes share an id.
    pub fn load(&self, definitions: Vec<RouteDefinition>) -> Result<(), RegistryError> {
        let mut seen = HashSet::new();
        for route in &definitions {
            if !seen.insert(route.id.as_str()) {
                return Err(RegistryError::DuplicateRoute(route.id.clone()));
            }
        }

        let count = definitions.len();
        self.routes.store(Arc::new(definitions));
        tracing::info!(routes = count, "Loaded routes");
        Ok(())
    }

    /// Validate raw records and replace the route list.
    pub fn load_records(&self, records: Vec<RouteRecord>) -> Result<(), RegistryError> {
        let definitions = records
            .into_iter()
            .map(RouteDefinition::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        self.load(definitions)
    }

    /// Snapshot of the current ordered route list.
    pub fn all_routes(&self) -> Arc<Vec<RouteDefinition>> {
        self.routes.load_full()
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
