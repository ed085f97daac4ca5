//! Mock connection
//!
//! The connection a [`MockDriver`] hands out for a registered DSN. Calls made
//! through a [`Database`] handle are checked against the expectations queued
//! on its [`MockController`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::config::MockConfig;
use crate::engine::database::Database;
use crate::engine::drivers::sqlmock::expectations::{Call, Expectation, ExpectationKind};
use crate::engine::drivers::sqlmock::matcher::QueryMatcher;
use crate::engine::drivers::sqlmock::{MockController, MockDriver, DRIVER_ID};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::Connection;
use crate::engine::types::{QueryResult, Value};

struct ConnectionState {
    ordered: bool,
    matcher: QueryMatcher,
    expected: Vec<Expectation>,
    in_transaction: bool,
}

impl ConnectionState {
    /// Finds the expectation satisfying `call`, triggers it and returns its response
    fn fulfil(&mut self, call: &Call<'_>) -> EngineResult<QueryResult> {
        let ordered = self.ordered;
        let matcher = self.matcher;
        let mut pending = false;
        let mut bad_pattern = None;

        for expectation in self.expected.iter_mut() {
            if expectation.is_triggered() {
                continue;
            }
            pending = true;

            match expectation.matches(call, matcher) {
                Ok(true) => return expectation.trigger(),
                Ok(false) => {}
                Err(err) if ordered => return Err(err),
                Err(err) => {
                    // a later expectation may still match
                    bad_pattern.get_or_insert(err);
                    continue;
                }
            }

            if ordered {
                return Err(EngineError::expectation_mismatch(format!(
                    "call to {} was not expected, next expectation is: {}",
                    call, expectation
                )));
            }
        }

        if let Some(err) = bad_pattern {
            Err(err)
        } else if pending {
            Err(EngineError::expectation_mismatch(format!(
                "call to {} was not expected",
                call
            )))
        } else {
            Err(EngineError::expectation_mismatch(format!(
                "all expectations were already fulfilled, call to {} was not expected",
                call
            )))
        }
    }
}

pub struct MockConnection {
    dsn: String,
    owner: Weak<MockDriver>,
    opened: AtomicU64,
    state: Mutex<ConnectionState>,
}

impl MockConnection {
    pub(crate) fn new(dsn: String, owner: Weak<MockDriver>, config: &MockConfig) -> Self {
        Self {
            dsn,
            owner,
            opened: AtomicU64::new(0),
            state: Mutex::new(ConnectionState {
                ordered: config.match_in_order,
                matcher: config.query_matcher,
                expected: Vec::new(),
                in_transaction: false,
            }),
        }
    }

    /// The DSN this connection is registered under
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// How many times the driver has resolved this connection
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::Acquire)
    }

    pub(crate) fn record_open(&self) {
        self.opened.fetch_add(1, Ordering::AcqRel);
    }

    /// Opens a handle on this connection through its owning driver and pings it
    #[instrument(skip(self), fields(dsn = %self.dsn))]
    pub async fn open(self: &Arc<Self>) -> EngineResult<(Database, MockController)> {
        let driver = self
            .owner
            .upgrade()
            .ok_or_else(|| EngineError::driver_not_found(DRIVER_ID))?;

        let db = Database::with_driver(driver, self.dsn.clone());
        db.ping().await?;

        debug!(opened = self.opened(), "mock database ready");
        Ok((db, MockController::new(Arc::clone(self))))
    }

    pub(crate) async fn push_expectation(&self, expectation: Expectation) {
        self.state.lock().await.expected.push(expectation);
    }

    pub(crate) async fn set_ordered(&self, ordered: bool) {
        self.state.lock().await.ordered = ordered;
    }

    pub(crate) async fn set_matcher(&self, matcher: QueryMatcher) {
        self.state.lock().await.matcher = matcher;
    }

    pub(crate) async fn expectations_were_met(&self) -> EngineResult<()> {
        let state = self.state.lock().await;
        match state.expected.iter().find(|e| !e.is_triggered()) {
            Some(remaining) => Err(EngineError::expectations_not_met(remaining.to_string())),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockConnection")
            .field("dsn", &self.dsn)
            .field("opened", &self.opened())
            .finish()
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn ping(&self) -> EngineResult<()> {
        Ok(())
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> EngineResult<QueryResult> {
        let mut state = self.state.lock().await;
        state.fulfil(&Call::statement(ExpectationKind::Exec, sql, args))
    }

    async fn query(&self, sql: &str, args: &[Value]) -> EngineResult<QueryResult> {
        let mut state = self.state.lock().await;
        state.fulfil(&Call::statement(ExpectationKind::Query, sql, args))
    }

    /// Consumes a close expectation; the registry entry stays in place
    async fn close(&self) -> EngineResult<()> {
        let mut state = self.state.lock().await;
        state.fulfil(&Call::bare(ExpectationKind::Close))?;
        Ok(())
    }

    async fn begin_transaction(&self) -> EngineResult<()> {
        let mut state = self.state.lock().await;
        if state.in_transaction {
            return Err(EngineError::transaction_error(
                "A transaction is already active on this connection",
            ));
        }

        state.fulfil(&Call::bare(ExpectationKind::Begin))?;
        state.in_transaction = true;
        Ok(())
    }

    async fn commit(&self) -> EngineResult<()> {
        let mut state = self.state.lock().await;
        if !state.in_transaction {
            return Err(EngineError::transaction_error("No active transaction to commit"));
        }

        state.fulfil(&Call::bare(ExpectationKind::Commit))?;
        state.in_transaction = false;
        Ok(())
    }

    async fn rollback(&self) -> EngineResult<()> {
        let mut state = self.state.lock().await;
        if !state.in_transaction {
            return Err(EngineError::transaction_error("No active transaction to rollback"));
        }

        state.fulfil(&Call::bare(ExpectationKind::Rollback))?;
        state.in_transaction = false;
        Ok(())
    }

    fn supports_transactions(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordered() -> MockConfig {
        MockConfig {
            match_in_order: true,
            query_matcher: QueryMatcher::Regex,
        }
    }

    #[tokio::test]
    async fn ordered_matching_rejects_out_of_order_calls() {
        let driver = MockDriver::with_config(ordered());
        let (db, mock) = driver.create().await.expect("create should succeed");

        mock.expect(Expectation::exec("INSERT INTO users")).await;
        mock.expect(Expectation::query("SELECT (.+) FROM users")).await;

        let err = db
            .query("SELECT id FROM users", &[])
            .await
            .expect_err("insert is expected first");
        assert!(matches!(err, EngineError::ExpectationMismatch { .. }));
        assert!(err.to_string().contains("next expectation is: Exec matching 'INSERT INTO users'"));
    }

    #[tokio::test]
    async fn unordered_matching_accepts_any_order() {
        let driver = MockDriver::with_config(ordered());
        let (db, mock) = driver.create().await.expect("create should succeed");
        mock.match_expectations_in_order(false).await;

        mock.expect(Expectation::exec("INSERT INTO users").will_return_result(
            QueryResult::with_affected_rows(1, 0.0).with_last_insert_id(42),
        ))
        .await;
        mock.expect(
            Expectation::query("SELECT (.+) FROM users")
                .will_return_rows(QueryResult::with_columns(["id"]).add_row([42])),
        )
        .await;

        let rows = db.query("SELECT id FROM users", &[]).await.expect("query expected");
        assert_eq!(rows.rows.len(), 1);

        let inserted = db
            .execute("INSERT INTO users (name) VALUES (?)", &[Value::from("alice")])
            .await
            .expect("exec expected");
        assert_eq!(inserted.affected_rows, Some(1));
        assert_eq!(inserted.last_insert_id, Some(42));

        mock.expectations_were_met().await.expect("all met");
    }

    #[tokio::test]
    async fn unexpected_call_after_all_fulfilled() {
        let driver = MockDriver::with_config(ordered());
        let (db, _mock) = driver.create().await.expect("create should succeed");

        let err = db.execute("DELETE FROM users", &[]).await.expect_err("nothing expected");
        assert!(err.to_string().starts_with(
            "all expectations were already fulfilled, call to Exec 'DELETE FROM users'"
        ));
    }

    #[tokio::test]
    async fn transaction_flow_follows_expectations() {
        let driver = MockDriver::with_config(ordered());
        let (db, mock) = driver.create().await.expect("create should succeed");

        mock.expect(Expectation::begin()).await;
        mock.expect(Expectation::exec("UPDATE accounts").with_args([100, 1])).await;
        mock.expect(Expectation::commit()).await;

        db.begin_transaction().await.expect("begin expected");
        db.execute(
            "UPDATE accounts SET balance = ? WHERE id = ?",
            &[Value::Int(100), Value::Int(1)],
        )
        .await
        .expect("update expected");
        db.commit().await.expect("commit expected");

        mock.expectations_were_met().await.expect("all met");
    }

    #[tokio::test]
    async fn rollback_without_transaction_fails() {
        let driver = MockDriver::with_config(ordered());
        let (db, mock) = driver.create().await.expect("create should succeed");
        mock.expect(Expectation::rollback()).await;

        let err = db.rollback().await.expect_err("no transaction active");
        assert_eq!(
            err,
            EngineError::transaction_error("No active transaction to rollback")
        );
        mock.expectations_were_met()
            .await
            .expect_err("rejected rollback leaves its expectation pending");
    }

    #[tokio::test]
    async fn nested_begin_leaves_its_expectation_pending() {
        let driver = MockDriver::with_config(ordered());
        let (db, mock) = driver.create().await.expect("create should succeed");
        mock.expect(Expectation::begin()).await;
        mock.expect(Expectation::begin()).await;

        db.begin_transaction().await.expect("first begin expected");
        let err = db
            .begin_transaction()
            .await
            .expect_err("a transaction is already active");
        assert_eq!(
            err,
            EngineError::transaction_error("A transaction is already active on this connection")
        );

        let err = mock
            .expectations_were_met()
            .await
            .expect_err("second begin never succeeded");
        assert!(matches!(err, EngineError::ExpectationsNotMet { .. }));
    }

    #[tokio::test]
    async fn unordered_search_skips_invalid_patterns() {
        let driver = MockDriver::with_config(ordered());
        let (db, mock) = driver.create().await.expect("create should succeed");
        mock.match_expectations_in_order(false).await;

        mock.expect(Expectation::query("SELECT (")).await;
        mock.expect(Expectation::query("SELECT 1")).await;

        db.query("SELECT 1", &[])
            .await
            .expect("later valid expectation matches");

        let err = db
            .query("SELECT 2", &[])
            .await
            .expect_err("only the invalid pattern is left");
        assert!(matches!(err, EngineError::InvalidPattern { .. }));
    }

    #[tokio::test]
    async fn ordered_search_reports_invalid_pattern() {
        let driver = MockDriver::with_config(ordered());
        let (db, mock) = driver.create().await.expect("create should succeed");
        mock.expect(Expectation::query("SELECT (")).await;

        let err = db.query("SELECT 1", &[]).await.expect_err("pattern does not compile");
        assert!(matches!(err, EngineError::InvalidPattern { .. }));
    }

    #[tokio::test]
    async fn scripted_errors_surface_through_the_handle() {
        let driver = MockDriver::with_config(ordered());
        let (db, mock) = driver.create().await.expect("create should succeed");
        mock.expect(Expectation::begin().will_return_error("connection reset")).await;

        let err = db.begin_transaction().await.expect_err("error scripted");
        assert_eq!(err, EngineError::execution_error("connection reset"));
    }

    #[tokio::test]
    async fn reports_unmet_expectations() {
        let driver = MockDriver::with_config(ordered());
        let (_db, mock) = driver.create().await.expect("create should succeed");
        mock.expect(Expectation::exec("TRUNCATE logs")).await;

        let err = mock.expectations_were_met().await.expect_err("exec never issued");
        assert_eq!(
            err.to_string(),
            "there is a remaining expectation which was not matched: Exec matching 'TRUNCATE logs'"
        );
    }

    #[tokio::test]
    async fn close_keeps_registry_entry_and_open_count() {
        let driver = MockDriver::with_config(ordered());
        let (db, mock) = driver.create().await.expect("create should succeed");
        mock.expect(Expectation::close()).await;

        db.close().await.expect("close expected");

        assert!(driver.contains(mock.dsn()).await);
        assert_eq!(mock.opened(), 1);
    }

    #[tokio::test]
    async fn open_fails_once_driver_is_gone() {
        let driver = MockDriver::with_config(ordered());
        let (db, mock) = driver.create().await.expect("create should succeed");
        let conn = Arc::clone(mock.connection());

        drop(db);
        drop(mock);
        drop(driver);

        let err = conn.open().await.expect_err("owner dropped");
        assert_eq!(err, EngineError::driver_not_found(DRIVER_ID));
    }
}
