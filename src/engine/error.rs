//! Engine error types
//!
//! Every fallible operation in the crate returns [`EngineResult`]. Errors raised
//! by a driver travel through the [`Database`](crate::engine::Database) handle
//! unchanged, so callers see the driver's own message.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Driver not found: {driver_id}")]
    DriverNotFound { driver_id: String },

    /// Raised when a driver is asked to open a DSN it never registered.
    #[error("expected a connection to be available, but it is not")]
    ConnectionUnavailable { dsn: String },

    #[error("cannot create a new mock database with the same dsn: {dsn}")]
    DuplicateDsn { dsn: String },

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Execution error: {message}")]
    ExecutionError { message: String },

    #[error("Transaction error: {message}")]
    TransactionError { message: String },

    #[error("{message}")]
    ExpectationMismatch { message: String },

    #[error("there is a remaining expectation which was not matched: {message}")]
    ExpectationsNotMet { message: String },

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Not supported: {message}")]
    NotSupported { message: String },
}

impl EngineError {
    pub fn driver_not_found(driver_id: impl Into<String>) -> Self {
        Self::DriverNotFound {
            driver_id: driver_id.into(),
        }
    }

    pub fn connection_unavailable(dsn: impl Into<String>) -> Self {
        Self::ConnectionUnavailable { dsn: dsn.into() }
    }

    pub fn duplicate_dsn(dsn: impl Into<String>) -> Self {
        Self::DuplicateDsn { dsn: dsn.into() }
    }

    pub fn execution_error(message: impl Into<String>) -> Self {
        Self::ExecutionError {
            message: message.into(),
        }
    }

    pub fn transaction_error(message: impl Into<String>) -> Self {
        Self::TransactionError {
            message: message.into(),
        }
    }

    pub fn expectation_mismatch(message: impl Into<String>) -> Self {
        Self::ExpectationMismatch {
            message: message.into(),
        }
    }

    pub fn expectations_not_met(message: impl Into<String>) -> Self {
        Self::ExpectationsNotMet {
            message: message.into(),
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_dsn_message_names_the_dsn() {
        let err = EngineError::duplicate_dsn("dsn_A");
        assert_eq!(
            err.to_string(),
            "cannot create a new mock database with the same dsn: dsn_A"
        );
    }

    #[test]
    fn unavailable_connection_keeps_fixed_message() {
        let err = EngineError::connection_unavailable("nonexistent");
        assert_eq!(
            err.to_string(),
            "expected a connection to be available, but it is not"
        );
    }
}
