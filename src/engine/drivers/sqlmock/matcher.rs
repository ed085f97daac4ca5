//! SQL matching strategies for expectations.

use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::error::{EngineError, EngineResult};

/// How an expected SQL string is compared with the SQL actually issued
///
/// Both sides have their whitespace collapsed to single spaces first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMatcher {
    /// Expected SQL is a regular expression searched for in the actual SQL
    #[default]
    Regex,
    /// Expected SQL must equal the actual SQL
    Equal,
}

impl QueryMatcher {
    pub fn matches(self, expected: &str, actual: &str) -> EngineResult<bool> {
        let expected = collapse_whitespace(expected);
        let actual = collapse_whitespace(actual);

        match self {
            Self::Regex => {
                let re = Regex::new(&expected)
                    .map_err(|e| EngineError::invalid_pattern(&expected, e.to_string()))?;
                Ok(re.is_match(&actual))
            }
            Self::Equal => Ok(expected == actual),
        }
    }
}

impl FromStr for QueryMatcher {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regex" | "regexp" => Ok(Self::Regex),
            "equal" | "exact" => Ok(Self::Equal),
            other => Err(EngineError::invalid_config(format!(
                "Unknown query matcher: {}",
                other
            ))),
        }
    }
}

fn collapse_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}
