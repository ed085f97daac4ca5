//! Scripted expectations a mock connection checks calls against.

use std::fmt;

use crate::engine::drivers::sqlmock::matcher::QueryMatcher;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{QueryResult, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectationKind {
    Begin,
    Commit,
    Rollback,
    Exec,
    Query,
    Close,
}

impl fmt::Display for ExpectationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Begin => "Begin",
            Self::Commit => "Commit",
            Self::Rollback => "Rollback",
            Self::Exec => "Exec",
            Self::Query => "Query",
            Self::Close => "Close",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Default,
    Result(QueryResult),
    Error(String),
}

/// One expected call, built fluently and handed to
/// [`MockController::expect`](crate::engine::drivers::sqlmock::MockController::expect)
///
/// ```ignore
/// mock.expect(
///     Expectation::exec("INSERT INTO users")
///         .with_args(["alice"])
///         .will_return_result(QueryResult::with_affected_rows(1, 0.0)),
/// )
/// .await;
/// ```
#[derive(Debug, Clone)]
pub struct Expectation {
    kind: ExpectationKind,
    sql: Option<String>,
    args: Option<Vec<Value>>,
    outcome: Outcome,
    triggered: bool,
}

impl Expectation {
    fn new(kind: ExpectationKind, sql: Option<String>) -> Self {
        Self {
            kind,
            sql,
            args: None,
            outcome: Outcome::Default,
            triggered: false,
        }
    }

    pub fn begin() -> Self {
        Self::new(ExpectationKind::Begin, None)
    }

    pub fn commit() -> Self {
        Self::new(ExpectationKind::Commit, None)
    }

    pub fn rollback() -> Self {
        Self::new(ExpectationKind::Rollback, None)
    }

    pub fn close() -> Self {
        Self::new(ExpectationKind::Close, None)
    }

    /// Expects a statement that does not return rows
    pub fn exec(sql: impl Into<String>) -> Self {
        Self::new(ExpectationKind::Exec, Some(sql.into()))
    }

    /// Expects a statement that returns rows
    pub fn query(sql: impl Into<String>) -> Self {
        Self::new(ExpectationKind::Query, Some(sql.into()))
    }

    /// Restricts the match to calls with exactly these arguments
    pub fn with_args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn will_return_result(mut self, result: QueryResult) -> Self {
        self.outcome = Outcome::Result(result);
        self
    }

    pub fn will_return_rows(self, rows: QueryResult) -> Self {
        self.will_return_result(rows)
    }

    pub fn will_return_error(mut self, message: impl Into<String>) -> Self {
        self.outcome = Outcome::Error(message.into());
        self
    }

    pub fn kind(&self) -> ExpectationKind {
        self.kind
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub(crate) fn matches(&self, call: &Call<'_>, matcher: QueryMatcher) -> EngineResult<bool> {
        if self.kind != call.kind {
            return Ok(false);
        }

        if let (Some(expected), Some(actual)) = (self.sql.as_deref(), call.sql) {
            if !matcher.matches(expected, actual)? {
                return Ok(false);
            }
        }

        Ok(match &self.args {
            Some(expected) => expected.as_slice() == call.args,
            None => true,
        })
    }

    /// Marks the expectation fulfilled and produces its scripted response
    pub(crate) fn trigger(&mut self) -> EngineResult<QueryResult> {
        self.triggered = true;

        match &self.outcome {
            Outcome::Default if self.kind == ExpectationKind::Exec => {
                Ok(QueryResult::with_affected_rows(0, 0.0))
            }
            Outcome::Default => Ok(QueryResult::empty()),
            Outcome::Result(result) => Ok(result.clone()),
            Outcome::Error(message) => Err(EngineError::execution_error(message.clone())),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(sql) = &self.sql {
            write!(f, " matching '{}'", sql)?;
        }
        if let Some(args) = &self.args {
            write!(f, " with args {:?}", args)?;
        }
        Ok(())
    }
}

/// A call made against a mock connection
pub(crate) struct Call<'a> {
    pub kind: ExpectationKind,
    pub sql: Option<&'a str>,
    pub args: &'a [Value],
}

impl<'a> Call<'a> {
    pub fn bare(kind: ExpectationKind) -> Self {
        Self {
            kind,
            sql: None,
            args: &[],
        }
    }

    pub fn statement(kind: ExpectationKind, sql: &'a str, args: &'a [Value]) -> Self {
        Self {
            kind,
            sql: Some(sql),
            args,
        }
    }
}

impl fmt::Display for Call<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(sql) = self.sql {
            write!(f, " '{}' with args {:?}", sql, self.args)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_must_match_exactly_when_given() {
        let expectation =
            Expectation::exec("UPDATE users").with_args([Value::from(1), Value::from("bob")]);

        let sql = "UPDATE users SET name = ?";
        let same = [Value::Int(1), Value::Text("bob".into())];
        let other = [Value::Int(2), Value::Text("bob".into())];

        let same_call = Call::statement(ExpectationKind::Exec, sql, &same);
        let other_call = Call::statement(ExpectationKind::Exec, sql, &other);

        assert!(expectation
            .matches(&same_call, QueryMatcher::Regex)
            .expect("valid pattern"));
        assert!(!expectation
            .matches(&other_call, QueryMatcher::Regex)
            .expect("valid pattern"));
    }

    #[test]
    fn kind_must_match() {
        let expectation = Expectation::query("SELECT");
        let call = Call::statement(ExpectationKind::Exec, "SELECT 1", &[]);
        assert!(!expectation.matches(&call, QueryMatcher::Regex).expect("valid pattern"));
    }

    #[test]
    fn exec_defaults_to_zero_affected_rows() {
        let mut expectation = Expectation::exec("DELETE");
        let result = expectation.trigger().expect("no error scripted");
        assert_eq!(result.affected_rows, Some(0));
        assert!(expectation.is_triggered());
    }

    #[test]
    fn scripted_error_is_returned() {
        let mut expectation = Expectation::commit().will_return_error("deadlock detected");
        let err = expectation.trigger().expect_err("error scripted");
        assert_eq!(err, EngineError::execution_error("deadlock detected"));
    }

    #[test]
    fn display_describes_sql_and_args() {
        let expectation = Expectation::query("SELECT (.+) FROM users").with_args([7]);
        assert_eq!(
            expectation.to_string(),
            "Query matching 'SELECT (.+) FROM users' with args [Int(7)]"
        );
    }
}
