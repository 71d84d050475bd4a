//! Configuration file parsing for `relweave.toml`.
//!
//! ```toml
//! [query]
//! dialect = "sqlite"
//! stable_ordering = true
//! nested_modifiers = "reject"
//! to_one_conflict = "error"
//! ```
//!
//! Values may reference environment variables as `${NAME}`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{QueryError, QueryResult};
use crate::relations::ToOneConflict;
use crate::sql::DatabaseType;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelweaveConfig {
    /// Query planning and hydration settings.
    #[serde(default)]
    pub query: QueryConfig,
}

impl RelweaveConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::configuration(format!("cannot read {}: {}", path.display(), e))
                .with_source(e)
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> QueryResult<Self> {
        let expanded = expand_env_vars(content)?;
        toml::from_str(&expanded).map_err(|e| {
            QueryError::configuration(format!("invalid configuration: {}", e.message()))
                .with_source(e)
        })
    }
}

/// What to do with ordering or pagination requested on a nested relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NestedModifiers {
    /// Fail at plan time.
    #[default]
    Reject,
    /// Accept and drop them with a warning.
    Ignore,
}

/// Settings for planning and hydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Placeholder style of the target database.
    pub dialect: DatabaseType,
    /// Append every loaded table's id to ORDER BY so each entity's rows stay together.
    pub stable_ordering: bool,
    /// Handling of order/skip/take on nested relations.
    pub nested_modifiers: NestedModifiers,
    /// Handling of a second distinct match for a single-valued relation.
    pub to_one_conflict: ToOneConflict,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            dialect: DatabaseType::PostgreSQL,
            stable_ordering: true,
            nested_modifiers: NestedModifiers::Reject,
            to_one_conflict: ToOneConflict::Error,
        }
    }
}

impl QueryConfig {
    /// Set the dialect.
    pub fn dialect(mut self, dialect: DatabaseType) -> Self {
        self.dialect = dialect;
        self
    }

    /// Enable or disable the id tie-breakers in ORDER BY.
    pub fn stable_ordering(mut self, enabled: bool) -> Self {
        self.stable_ordering = enabled;
        self
    }

    /// Set nested modifier handling.
    pub fn nested_modifiers(mut self, mode: NestedModifiers) -> Self {
        self.nested_modifiers = mode;
        self
    }

    /// Set the single-valued relation conflict policy.
    pub fn to_one_conflict(mut self, policy: ToOneConflict) -> Self {
        self.to_one_conflict = policy;
        self
    }
}

/// Expand environment variables in the format `${VAR_NAME}`.
///
/// Unset variables are left as written.
fn expand_env_vars(content: &str) -> QueryResult<String> {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| QueryError::internal(format!("env pattern: {}", e)))?;

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(value) => result = result.replace(&cap[0], &value),
            Err(_) => tracing::debug!(var = var_name, "configuration references unset variable"),
        }
    }
    Ok(result)
}
