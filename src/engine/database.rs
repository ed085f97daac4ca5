//! Database handle
//!
//! The handle callers issue statements through. It owns no connection state of
//! its own beyond the physical connection it last obtained from its driver:
//! that connection is opened lazily through [`Driver::open`] and reused until
//! it is dropped or the handle is closed.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::registry::DriverRegistry;
use crate::engine::traits::{Connection, Driver};
use crate::engine::types::{QueryResult, Value};

pub struct Database {
    driver: Arc<dyn Driver>,
    dsn: String,
    conn: Mutex<Option<Arc<dyn Connection>>>,
    closed: AtomicBool,
}

impl Database {
    /// Resolves `driver_id` in the registry and binds a handle to `dsn`
    ///
    /// Nothing is opened yet; the first operation does that.
    pub fn open(
        registry: &DriverRegistry,
        driver_id: &str,
        dsn: impl Into<String>,
    ) -> EngineResult<Self> {
        let driver = registry
            .get(driver_id)
            .ok_or_else(|| EngineError::driver_not_found(driver_id))?;

        Ok(Self::with_driver(driver, dsn))
    }

    /// Binds a handle to an already resolved driver
    pub fn with_driver(driver: Arc<dyn Driver>, dsn: impl Into<String>) -> Self {
        Self {
            driver,
            dsn: dsn.into(),
            conn: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn driver_id(&self) -> &'static str {
        self.driver.driver_id()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns the current physical connection, opening one if needed
    async fn connection(&self) -> EngineResult<Arc<dyn Connection>> {
        if self.is_closed() {
            return Err(EngineError::ConnectionClosed);
        }

        let mut conn = self.conn.lock().await;
        // close() may have won the lock while we waited
        if self.is_closed() {
            return Err(EngineError::ConnectionClosed);
        }
        if let Some(existing) = conn.as_ref() {
            return Ok(Arc::clone(existing));
        }

        debug!(driver = self.driver.driver_id(), dsn = %self.dsn, "opening connection");
        let opened = self.driver.open(&self.dsn).await?;
        *conn = Some(Arc::clone(&opened));
        Ok(opened)
    }

    /// Verifies the handle can reach its connection, opening it if needed
    #[instrument(skip(self), fields(dsn = %self.dsn))]
    pub async fn ping(&self) -> EngineResult<()> {
        self.connection().await?.ping().await
    }

    #[instrument(skip(self, args), fields(dsn = %self.dsn))]
    pub async fn execute(&self, sql: &str, args: &[Value]) -> EngineResult<QueryResult> {
        self.connection().await?.execute(sql, args).await
    }

    #[instrument(skip(self, args), fields(dsn = %self.dsn))]
    pub async fn query(&self, sql: &str, args: &[Value]) -> EngineResult<QueryResult> {
        self.connection().await?.query(sql, args).await
    }

    pub async fn begin_transaction(&self) -> EngineResult<()> {
        self.connection().await?.begin_transaction().await
    }

    pub async fn commit(&self) -> EngineResult<()> {
        self.connection().await?.commit().await
    }

    pub async fn rollback(&self) -> EngineResult<()> {
        self.connection().await?.rollback().await
    }

    /// Discards the current physical connection without closing the handle
    ///
    /// The next operation asks the driver for a fresh one.
    pub async fn drop_connection(&self) {
        let mut conn = self.conn.lock().await;
        *conn = None;
    }

    /// Closes the handle and its connection, if one was ever opened
    ///
    /// Closing twice is a no-op. Any later operation fails with
    /// [`EngineError::ConnectionClosed`].
    #[instrument(skip(self), fields(dsn = %self.dsn))]
    pub async fn close(&self) -> EngineResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let conn = self.conn.lock().await.take();
        match conn {
            Some(conn) => conn.close().await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("driver", &self.driver.driver_id())
            .field("dsn", &self.dsn)
            .field("closed", &self.is_closed())
            .finish()
    }
}
