//! The database boundary.

pub use futures::future::BoxFuture;

use crate::error::QueryResult;
use crate::row::Row;
use crate::value::Value;

/// Runs one planned SELECT and returns its rows in database order.
///
/// Implementations convert their driver rows into [`Row`]s keyed by the
/// column aliases in the SQL. Timeouts, retries and pooling belong here,
/// not in the planner or hydrator.
pub trait QueryEngine: Send + Sync + Clone + 'static {
    /// Execute `sql` with positional `params`.
    fn query_rows(&self, sql: &str, params: Vec<Value>) -> BoxFuture<'_, QueryResult<Vec<Row>>>;
}
