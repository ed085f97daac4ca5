// Data Engine Module
// Pluggable-driver SQL access layer and the mock driver

pub mod database;
pub mod drivers;
pub mod error;
pub mod registry;
pub mod traits;
pub mod types;

pub use database::Database;
pub use error::{EngineError, EngineResult};
pub use registry::DriverRegistry;
pub use traits::{Connection, Driver};
pub use types::*;
