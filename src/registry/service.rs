//! Service registry: service name → base URL.
//!
//! Written once at startup, read by every request. The map is swapped
//! whole, so concurrent readers see the old map or the new one.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::GatewayError;
use crate::registry::RegistryError;

/// A named backend reachable at a base URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceEntry {
    pub name: String,
    #[serde(rename = "baseURL", alias = "url", alias = "baseUrl")]
    pub base_url: String,
}

impl ServiceEntry {
    /// Validate and normalize an entry. A trailing `/` is trimmed so that
    /// appending the request path never doubles the separator.
    pub fn new(name: impl Into<String>, base_url: &str) -> Result<Self, RegistryError> {
        let name = name.into();
        let invalid = |reason: &str| RegistryError::InvalidBaseUrl {
            service: name.clone(),
            url: base_url.to_string(),
            reason: reason.to_string(),
        };

        let parsed = Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;
        if parsed.scheme() != "http" {
            return Err(invalid("only http:// backends are supported"));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(invalid("query and fragment are not allowed"));
        }

        Ok(Self {
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug)]
pub struct ServiceRegistry {
    services: ArcSwap<HashMap<String, Arc<ServiceEntry>>>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            services: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Create a registry already holding `entries`.
    pub fn with_services(entries: Vec<ServiceEntry>) -> Result<Self, RegistryError> {
        let registry = Self::new();
        registry.load(entries)?;
        Ok(registry)
    }

    /// Replace the entire mapping. Every entry is validated first; on any
    /// error the current mapping is left untouched.
    pub fn load(&self, entries: Vec<ServiceEntry>) -> Result<(), RegistryError> {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            let entry = ServiceEntry::new(entry.name, &entry.base_url)?;
            if map.contains_key(&entry.name) {
                return Err(RegistryError::DuplicateService(entry.name));
            }
            map.insert(entry.name.clone(), Arc::new(entry));
        }

        let count = map.len();
        self.services.store(Arc::new(map));
        tracing::info!(services = count, "Loaded services");
        Ok(())
    }

    /// Look up a service by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<ServiceEntry>, GatewayError> {
        self.services
            .load()
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::ServiceNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.load().contains_key(name)
    }

    /// All entries, sorted by name.
    pub fn entries(&self) -> Vec<Arc<ServiceEntry>> {
        let mut entries: Vec<_> = self.services.load().values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn len(&self) -> usize {
        self.services.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Log every accessible service.
    pub fn log_services(&self) {
        for entry in self.entries() {
            tracing::info!(service = %entry.name, base_url = %entry.base_url, "Accessible service");
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
