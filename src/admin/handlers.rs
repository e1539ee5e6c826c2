use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::error::ApiResponse;
use crate::registry::{RouteDefinition, ServiceEntry};
use crate::resilience::{CircuitSnapshot, State as CircuitState};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub services: usize,
    pub routes: usize,
    pub open_circuits: usize,
}

#[derive(Debug, Serialize)]
pub struct RouteStatus {
    #[serde(flatten)]
    pub route: RouteDefinition,
    /// The route's service is `welcome` or registered.
    pub resolved: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<ApiResponse<SystemStatus>> {
    let open_circuits = state
        .breaker
        .snapshots()
        .iter()
        .filter(|s| s.state != CircuitState::Closed)
        .count();

    Json(ApiResponse::success(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        services: state.services.len(),
        routes: state.routes.len(),
        open_circuits,
    }))
}

pub async fn get_services(State(state): State<AdminState>) -> Json<ApiResponse<Vec<ServiceEntry>>> {
    let services = state.services.entries().iter().map(|e| e.as_ref().clone()).collect();
    Json(ApiResponse::success(services))
}

pub async fn get_routes(State(state): State<AdminState>) -> Json<ApiResponse<Vec<RouteStatus>>> {
    let routes = state
        .routes
        .all_routes()
        .iter()
        .map(|route| RouteStatus {
            resolved: route.is_welcome() || state.services.contains(&route.service_name),
            route: route.clone(),
        })
        .collect();
    Json(ApiResponse::success(routes))
}

pub async fn get_circuits(State(state): State<AdminState>) -> Json<ApiResponse<Vec<CircuitSnapshot>>> {
    Json(ApiResponse::success(state.breaker.snapshots()))
}
