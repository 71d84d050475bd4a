//! Ordering types used by the root query.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

use crate::binding::LocalBinding;
use crate::error::{QueryError, QueryResult};

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Null handling in sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
    /// Nulls appear first in the results.
    First,
    /// Nulls appear last in the results.
    Last,
}

impl NullsOrder {
    /// Get the SQL clause for this null order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }
}

/// One ORDER BY term, naming its column with a relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByField {
    /// Column expression, resolved against the root binding.
    pub column: SmolStr,
    /// The sort order.
    pub order: SortOrder,
    /// Null handling (optional).
    pub nulls: Option<NullsOrder>,
}

impl OrderByField {
    /// Create a new order by field.
    pub fn new(column: impl Into<SmolStr>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
            nulls: None,
        }
    }

    /// Create an ascending order.
    pub fn asc(column: impl Into<SmolStr>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    /// Create a descending order.
    pub fn desc(column: impl Into<SmolStr>) -> Self {
        Self::new(column, SortOrder::Desc)
    }

    /// Set null handling.
    pub fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }

    /// Resolve the column and render `alias.column ASC [NULLS ...]`.
    ///
    /// Only columns of the binding's own node are accepted: ordering by a
    /// joined column would split the rows of one root entity apart.
    pub fn to_sql(&self, binding: &LocalBinding<'_>) -> QueryResult<String> {
        let node = binding.resolve_node(&self.column)?;
        if node != binding.registry().node_at(binding.path())? {
            return Err(QueryError::invalid_ordering(self.column.as_str()));
        }
        let mut sql = binding.qualified(&self.column)?;
        sql.push(' ');
        sql.push_str(self.order.as_sql());
        if let Some(nulls) = self.nulls {
            sql.push(' ');
            sql.push_str(nulls.as_sql());
        }
        Ok(sql)
    }
}

/// Order by specification that can be a single field or multiple fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    /// Order by a single field.
    Field(OrderByField),
    /// Order by multiple fields.
    Fields(Vec<OrderByField>),
}

impl OrderBy {
    /// Create an empty order by (no ordering).
    pub fn none() -> Self {
        Self::Fields(Vec::new())
    }

    /// Check if the order by is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Field(_) => false,
            Self::Fields(fields) => fields.is_empty(),
        }
    }

    /// Add a field to the order by.
    pub fn then(self, field: OrderByField) -> Self {
        match self {
            Self::Field(existing) => Self::Fields(vec![existing, field]),
            Self::Fields(mut fields) => {
                fields.push(field);
                Self::Fields(fields)
            }
        }
    }

    /// Fields in priority order.
    pub fn fields(&self) -> &[OrderByField] {
        match self {
            Self::Field(field) => std::slice::from_ref(field),
            Self::Fields(fields) => fields,
        }
    }
}

impl Default for OrderBy {
    fn default() -> Self {
        Self::none()
    }
}

impl From<OrderByField> for OrderBy {
    fn from(field: OrderByField) -> Self {
        Self::Field(field)
    }
}

impl From<Vec<OrderByField>> for OrderBy {
    fn from(fields: Vec<OrderByField>) -> Self {
        Self::Fields(fields)
    }
}
