//! Seed file loading for the registries.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::registry::{RegistryError, RouteDefinition, RouteRecord, RouteRegistry, ServiceEntry, ServiceRegistry};

fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, RegistryError> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| RegistryError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| RegistryError::Parse { path: display, source })
}

/// Load `services.json` into `registry`, replacing its contents.
pub fn load_service_file(registry: &ServiceRegistry, path: &Path) -> Result<(), RegistryError> {
    let entries: Vec<ServiceEntry> = read_json_array(path)?;
    registry.load(entries)
}

/// Load `routes.json` into `registry`, replacing its contents.
pub fn load_route_file(registry: &RouteRegistry, path: &Path) -> Result<(), RegistryError> {
    let records: Vec<RouteRecord> = read_json_array(path)?;
    registry.load_records(records)
}

/// Routes whose target is neither the local welcome handler nor a
/// registered service.
pub fn unresolved_routes(routes: &RouteRegistry, services: &ServiceRegistry) -> Vec<RouteDefinition> {
    routes
        .all_routes()
        .iter()
        .filter(|r| !r.is_welcome() && !services.contains(&r.service_name))
        .cloned()
        .collect()
}
