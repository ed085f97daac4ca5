//! Mock controller
//!
//! Companion of a mock [`Database`](crate::engine::Database) handle, used by
//! tests to queue expectations and assert they were all met.

use std::sync::Arc;

use crate::engine::drivers::sqlmock::connection::MockConnection;
use crate::engine::drivers::sqlmock::expectations::Expectation;
use crate::engine::drivers::sqlmock::matcher::QueryMatcher;
use crate::engine::error::EngineResult;

#[derive(Debug, Clone)]
pub struct MockController {
    conn: Arc<MockConnection>,
}

impl MockController {
    pub(crate) fn new(conn: Arc<MockConnection>) -> Self {
        Self { conn }
    }

    pub fn dsn(&self) -> &str {
        self.conn.dsn()
    }

    /// Number of times the driver resolved the underlying connection
    pub fn opened(&self) -> u64 {
        self.conn.opened()
    }

    pub fn connection(&self) -> &Arc<MockConnection> {
        &self.conn
    }

    /// Queues an expectation after those already registered
    pub async fn expect(&self, expectation: Expectation) {
        self.conn.push_expectation(expectation).await;
    }

    /// Switches between ordered (the default) and unordered matching
    pub async fn match_expectations_in_order(&self, ordered: bool) {
        self.conn.set_ordered(ordered).await;
    }

    pub async fn set_query_matcher(&self, matcher: QueryMatcher) {
        self.conn.set_matcher(matcher).await;
    }

    /// Fails with the first expectation that was never triggered
    pub async fn expectations_were_met(&self) -> EngineResult<()> {
        self.conn.expectations_were_met().await
    }
}
