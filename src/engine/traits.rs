//! Driver and Connection trait definitions
//!
//! These are the plug-in contract of the SQL-access layer. A driver is
//! registered under a fixed name and knows how to turn a DSN into a live
//! connection; the [`Database`](crate::engine::Database) handle does the rest.

use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{QueryResult, Value};

/// Core trait that every pluggable driver must implement
#[async_trait]
pub trait Driver: Send + Sync {
    /// Returns the name the driver is registered under (e.g., "sqlmock")
    fn driver_id(&self) -> &'static str;

    /// Returns a human-readable name for this driver
    fn driver_name(&self) -> &'static str;

    /// Opens a physical connection for the given DSN
    ///
    /// Called by the database handle every time it needs a new connection,
    /// not just the first time.
    async fn open(&self, dsn: &str) -> EngineResult<Arc<dyn Connection>>;
}

/// A physical connection handed out by a [`Driver`]
#[async_trait]
pub trait Connection: Send + Sync {
    /// Checks that the connection is alive
    async fn ping(&self) -> EngineResult<()>;

    /// Executes a statement that does not return rows
    async fn execute(&self, sql: &str, args: &[Value]) -> EngineResult<QueryResult>;

    /// Executes a statement that returns rows
    async fn query(&self, sql: &str, args: &[Value]) -> EngineResult<QueryResult>;

    /// Releases the connection
    async fn close(&self) -> EngineResult<()>;

    // ==================== Transaction Methods ====================
    // Default implementations return NotSupported.

    async fn begin_transaction(&self) -> EngineResult<()> {
        Err(EngineError::not_supported(
            "Transactions are not supported by this driver",
        ))
    }

    async fn commit(&self) -> EngineResult<()> {
        Err(EngineError::not_supported(
            "Transactions are not supported by this driver",
        ))
    }

    async fn rollback(&self) -> EngineResult<()> {
        Err(EngineError::not_supported(
            "Transactions are not supported by this driver",
        ))
    }

    fn supports_transactions(&self) -> bool {
        false
    }
}
