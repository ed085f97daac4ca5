//! Driver Registry
//!
//! Name-keyed directory of the drivers a [`Database`](crate::engine::Database)
//! can be opened with. Replaces a process-wide registration table: build one,
//! register drivers into it, and pass it to whoever opens handles.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::engine::traits::Driver;

/// Registry that holds all available drivers
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Registers a new driver
    ///
    /// The driver's `driver_id()` is used as the key. Registering a second
    /// driver under the same name replaces the first.
    pub fn register(&mut self, driver: Arc<dyn Driver>) {
        let id = driver.driver_id().to_string();
        debug!(driver = %id, "registering driver");
        self.drivers.insert(id, driver);
    }

    /// Gets a driver by its ID
    pub fn get(&self, driver_id: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(driver_id).cloned()
    }

    /// Lists all registered driver IDs
    pub fn list(&self) -> Vec<&str> {
        self.drivers.keys().map(|s| s.as_str()).collect()
    }

    /// Returns the number of registered drivers
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Returns true if no drivers are registered
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
