//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the service and route seed files
//! - Warn about routes whose service is not registered
//! - Assemble the shared registries, breaker, and handler state
//!
//! # Design Decisions
//! - Fail fast: an unreadable or invalid seed file is fatal
//! - A dangling route is not fatal; it answers 404 until its service exists

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::admin::AdminState;
use crate::config::GatewayConfig;
use crate::forwarding::RequestForwarder;
use crate::http::{AppState, GatewayServer};
use crate::registry::{load_route_file, load_service_file, unresolved_routes, RegistryError, RouteRegistry, ServiceRegistry};
use crate::resilience::CircuitBreaker;
use crate::routing::RequestRouter;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// The assembled gateway components.
#[derive(Debug, Clone)]
pub struct Gateway {
    pub routes: Arc<RouteRegistry>,
    pub services: Arc<ServiceRegistry>,
    pub breaker: Arc<CircuitBreaker>,
    pub state: AppState,
}

impl Gateway {
    /// Wire the components around already-populated registries.
    pub fn from_registries(config: &GatewayConfig, routes: Arc<RouteRegistry>, services: Arc<ServiceRegistry>) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(&config.circuit_breaker));
        let forwarder = RequestForwarder::from_config(config, services.clone(), breaker.clone());
        let router = RequestRouter::new(routes.clone());

        for route in unresolved_routes(&routes, &services) {
            tracing::warn!(
                route = %route.id,
                service = %route.service_name,
                "Route targets an unregistered service"
            );
        }

        Self {
            routes,
            services,
            breaker,
            state: AppState::new(router, forwarder),
        }
    }

    pub fn server(&self) -> GatewayServer {
        GatewayServer::new(self.state.clone())
    }

    pub fn admin_state(&self, config: &GatewayConfig) -> AdminState {
        AdminState::new(
            self.routes.clone(),
            self.services.clone(),
            self.breaker.clone(),
            &config.admin.api_key,
        )
    }
}

/// Load the seed files named in `config` and assemble the gateway.
pub fn build_gateway(config: &GatewayConfig) -> Result<Gateway, StartupError> {
    let services = Arc::new(ServiceRegistry::new());
    load_service_file(&services, Path::new(&config.registry.services_path))?;

    let routes = Arc::new(RouteRegistry::new());
    load_route_file(&routes, Path::new(&config.registry.routes_path))?;

    services.log_services();
    tracing::info!(services = services.len(), routes = routes.len(), "Registries loaded");

    Ok(Gateway::from_registries(config, routes, services))
}

/// Bind a TCP listener, naming the address on failure.
pub async fn bind(address: &str) -> Result<tokio::net::TcpListener, StartupError> {
    tokio::net::TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}
