//! Mock driver configuration.
//!
//! Defaults match the behavior most tests expect: expectations are matched in
//! registration order and expected SQL is a regular expression. Environment
//! variables override the defaults so a whole test run can switch behavior
//! without touching code.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::drivers::sqlmock::QueryMatcher;
use crate::engine::error::{EngineError, EngineResult};

const ENV_MATCH_IN_ORDER: &str = "SQLMOCK_MATCH_IN_ORDER";
const ENV_QUERY_MATCHER: &str = "SQLMOCK_QUERY_MATCHER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// New connections require expectations to be met in order
    pub match_in_order: bool,
    pub query_matcher: QueryMatcher,
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_bool_opt(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| parse_bool(&value))
}

impl MockConfig {
    fn defaults() -> Self {
        Self {
            match_in_order: true,
            query_matcher: QueryMatcher::Regex,
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Some(value) = env_bool_opt(ENV_MATCH_IN_ORDER) {
            self.match_in_order = value;
        }
        if let Ok(raw) = std::env::var(ENV_QUERY_MATCHER) {
            match raw.parse::<QueryMatcher>() {
                Ok(matcher) => self.query_matcher = matcher,
                Err(err) => warn!(%err, "ignoring {}", ENV_QUERY_MATCHER),
            }
        }
    }

    /// Defaults with environment overrides applied
    pub fn load() -> Self {
        let mut config = Self::defaults();
        config.apply_env_overrides();
        config
    }

    /// Parses a JSON document; missing fields keep their defaults
    pub fn from_json(raw: &str) -> EngineResult<Self> {
        serde_json::from_str(raw).map_err(|e| EngineError::invalid_config(e.to_string()))
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self::defaults()
    }
}
