// sqlmock - database handles backed by scripted mock connections
// Core library

pub mod config;
pub mod engine;
pub mod observability;

pub use config::MockConfig;
pub use engine::drivers::sqlmock::{
    Expectation, ExpectationKind, MockConnection, MockController, MockDriver, QueryMatcher,
    DRIVER_ID,
};
pub use engine::{Database, DriverRegistry, EngineError, EngineResult, QueryResult, Value};
