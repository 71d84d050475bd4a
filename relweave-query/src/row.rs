//! Result rows as seen by the hydrator.
//!
//! Drivers hand back rows keyed by the SELECT aliases produced by the
//! alias registry (`usersid`, `t1_title`, ...). The hydrator only needs
//! to look a value up by that name, so any driver row can take part by
//! implementing [`RowRef`]; [`Row`] is the ordered in-memory form.

use indexmap::IndexMap;
use std::fmt;

use crate::error::QueryError;
use crate::value::Value;

/// Error type for row access and column decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RowError {
    /// Column not found.
    ColumnNotFound(String),
    /// Type conversion error.
    TypeConversion { column: String, message: String },
    /// Null value in non-nullable column.
    UnexpectedNull(String),
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColumnNotFound(col) => write!(f, "column '{}' not found", col),
            Self::TypeConversion { column, message } => {
                write!(f, "type conversion error for '{}': {}", column, message)
            }
            Self::UnexpectedNull(col) => write!(f, "unexpected null in column '{}'", col),
        }
    }
}

impl std::error::Error for RowError {}

impl From<RowError> for QueryError {
    fn from(err: RowError) -> Self {
        match &err {
            RowError::TypeConversion { column, message } => {
                QueryError::invalid_data_type(column.clone(), message.clone()).with_source(err)
            }
            RowError::ColumnNotFound(_) | RowError::UnexpectedNull(_) => {
                QueryError::deserialization(err.to_string()).with_source(err)
            }
        }
    }
}

/// A result row addressable by column name.
pub trait RowRef {
    /// Value of `column`; missing columns are an error, SQL NULL is [`Value::Null`].
    fn value(&self, column: &str) -> Result<Value, RowError>;

    /// Whether `column` holds SQL NULL.
    fn is_null(&self, column: &str) -> Result<bool, RowError> {
        self.value(column).map(|v| v.is_null())
    }
}

impl<R: RowRef + ?Sized> RowRef for &R {
    fn value(&self, column: &str) -> Result<Value, RowError> {
        (**self).value(column)
    }
}

/// An owned row with columns in SELECT order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: IndexMap<String, Value>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column, builder style.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Add or replace a column.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Borrow a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names and values in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl RowRef for Row {
    fn value(&self, column: &str) -> Result<Value, RowError> {
        self.columns
            .get(column)
            .cloned()
            .ok_or_else(|| RowError::ColumnNotFound(column.to_string()))
    }
}
