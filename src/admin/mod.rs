//! Read-only admin API.
//!
//! Served on its own listener so it is never reachable through the
//! gateway's catch-all routes.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};

use crate::registry::{RouteRegistry, ServiceRegistry};
use crate::resilience::CircuitBreaker;

use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by the admin handlers.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub routes: Arc<RouteRegistry>,
    pub services: Arc<ServiceRegistry>,
    pub breaker: Arc<CircuitBreaker>,
    pub api_key: Arc<str>,
    pub started_at: Instant,
}

impl AdminState {
    pub fn new(
        routes: Arc<RouteRegistry>,
        services: Arc<ServiceRegistry>,
        breaker: Arc<CircuitBreaker>,
        api_key: &str,
    ) -> Self {
        Self {
            routes,
            services,
            breaker,
            api_key: Arc::from(api_key),
            started_at: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/services", get(get_services))
        .route("/admin/routes", get(get_routes))
        .route("/admin/circuits", get(get_circuits))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
