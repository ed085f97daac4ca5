//! sqlmock Driver
//!
//! A driver whose connections are scripted doubles instead of network
//! sessions. It keeps a DSN-keyed directory of [`MockConnection`]s and answers
//! [`Driver::open`] by looking the DSN up in it.
//!
//! ## Identifiers
//!
//! [`MockDriver::create`] names each new connection `sqlmock_db_{n}` from a
//! counter that only grows. [`MockDriver::create_with_dsn`] lets the caller
//! pick the name, for code that can only be handed a connection string.
//! Entries are never removed: a DSN stays bound to its connection for the
//! lifetime of the driver.
//!
//! ## Locking
//!
//! One lock covers the counter and the directory. It is held only for the
//! lookup or the check-and-insert; opening and pinging the new handle happens
//! after it is released.

mod connection;
mod controller;
mod expectations;
mod matcher;

pub use connection::MockConnection;
pub use controller::MockController;
pub use expectations::{Expectation, ExpectationKind};
pub use matcher::QueryMatcher;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::config::MockConfig;
use crate::engine::database::Database;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::registry::DriverRegistry;
use crate::engine::traits::{Connection, Driver};

/// Name the driver registers under
pub const DRIVER_ID: &str = "sqlmock";

const DSN_PREFIX: &str = "sqlmock_db_";

#[derive(Default)]
struct DriverState {
    counter: u64,
    connections: HashMap<String, Arc<MockConnection>>,
}

/// Driver resolving DSNs to the mock connections it created
///
/// Cheap to construct; give each test its own instance so identifiers and
/// counters never leak between tests.
pub struct MockDriver {
    state: Mutex<DriverState>,
    config: MockConfig,
}

impl MockDriver {
    /// Creates a driver configured from the environment
    pub fn new() -> Arc<Self> {
        Self::with_config(MockConfig::load())
    }

    pub fn with_config(config: MockConfig) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(DriverState::default()),
            config,
        })
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Registers this driver under [`DRIVER_ID`]
    pub fn register(self: &Arc<Self>, registry: &mut DriverRegistry) {
        registry.register(Arc::clone(self) as Arc<dyn Driver>);
    }

    /// Looks up the connection registered under `dsn` and counts the open
    #[instrument(skip(self))]
    pub async fn resolve(&self, dsn: &str) -> EngineResult<Arc<MockConnection>> {
        let conn = {
            let state = self.state.lock().await;
            state.connections.get(dsn).cloned()
        };

        match conn {
            Some(conn) => {
                conn.record_open();
                Ok(conn)
            }
            None => {
                warn!("no mock connection registered for dsn");
                Err(EngineError::connection_unavailable(dsn))
            }
        }
    }

    /// Creates a mock database under a freshly generated DSN
    ///
    /// Returns a pinged handle and the controller for its expectations.
    #[instrument(skip(self))]
    pub async fn create(self: &Arc<Self>) -> EngineResult<(Database, MockController)> {
        let conn = {
            let mut state = self.state.lock().await;
            let dsn = format!("{}{}", DSN_PREFIX, state.counter);
            state.counter += 1;

            // A caller may have claimed this name through create_with_dsn.
            if state.connections.contains_key(&dsn) {
                warn!(%dsn, "generated dsn is already taken");
                return Err(EngineError::duplicate_dsn(dsn));
            }
            self.insert(&mut state, dsn)
        };

        conn.open().await
    }

    /// Creates a mock database under a caller-chosen DSN
    ///
    /// Fails without touching the existing entry if `dsn` is already taken.
    #[instrument(skip(self, dsn), fields(dsn))]
    pub async fn create_with_dsn(
        self: &Arc<Self>,
        dsn: impl Into<String>,
    ) -> EngineResult<(Database, MockController)> {
        let dsn = dsn.into();
        tracing::Span::current().record("dsn", dsn.as_str());

        let conn = {
            let mut state = self.state.lock().await;
            if state.connections.contains_key(&dsn) {
                warn!("dsn is already registered");
                return Err(EngineError::duplicate_dsn(dsn));
            }
            self.insert(&mut state, dsn)
        };

        conn.open().await
    }

    fn insert(self: &Arc<Self>, state: &mut DriverState, dsn: String) -> Arc<MockConnection> {
        let conn = Arc::new(MockConnection::new(
            dsn.clone(),
            Arc::downgrade(self),
            &self.config,
        ));
        debug!(%dsn, "registered mock connection");
        state.connections.insert(dsn, Arc::clone(&conn));
        conn
    }

    /// Returns true if a connection is registered under `dsn`
    pub async fn contains(&self, dsn: &str) -> bool {
        self.state.lock().await.connections.contains_key(dsn)
    }

    /// Number of registered connections
    pub async fn len(&self) -> usize {
        self.state.lock().await.connections.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn driver_id(&self) -> &'static str {
        DRIVER_ID
    }

    fn driver_name(&self) -> &'static str {
        "SQL Mock"
    }

    async fn open(&self, dsn: &str) -> EngineResult<Arc<dyn Connection>> {
        let conn = self.resolve(dsn).await?;
        Ok(conn as Arc<dyn Connection>)
    }
}
