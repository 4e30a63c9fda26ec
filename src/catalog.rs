//! Service catalog loaded from a JSON file.
//!
//! ```json
//! [
//!   {"index": 1, "name": "Translation", "price": 150},
//!   {"index": 2, "name": "Design", "price": 300, "unit": "page"}
//! ]
//! ```
//!
//! Fields beyond `index`, `name` and `price` are kept as-is. Price edits live
//! in memory only and are never written back to the file.

use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::CatalogError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub index: i64,
    pub name: String,
    pub price: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Service {
    pub fn new(index: i64, name: impl Into<String>, price: f64) -> Self {
        Self {
            index,
            name: name.into(),
            price,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ServiceCatalog {
    services: RwLock<Vec<Service>>,
}

impl ServiceCatalog {
    pub fn from_services(services: Vec<Service>) -> Self {
        Self {
            services: RwLock::new(services),
        }
    }

    /// Load the catalog file. A missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Service catalog not found, starting empty");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(CatalogError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let services: Vec<Service> =
            serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(count = services.len(), "Loaded service catalog");
        Ok(Self::from_services(services))
    }

    pub fn all(&self) -> Result<Vec<Service>, CatalogError> {
        let services = self.services.read().map_err(|_| CatalogError::LockPoisoned)?;
        Ok(services.clone())
    }

    pub fn by_index(&self, index: i64) -> Result<Option<Service>, CatalogError> {
        let services = self.services.read().map_err(|_| CatalogError::LockPoisoned)?;
        Ok(services.iter().find(|s| s.index == index).cloned())
    }

    /// Set the price of the first service named exactly `name`.
    pub fn update_price(&self, name: &str, price: f64) -> Result<Service, CatalogError> {
        let mut services = self
            .services
            .write()
            .map_err(|_| CatalogError::LockPoisoned)?;
        let service = services
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| CatalogError::ServiceNotFound(name.to_string()))?;
        service.price = price;
        tracing::info!(service = name, price, "Updated service price");
        Ok(service.clone())
    }
}
