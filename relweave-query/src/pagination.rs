//! Offset pagination for the root query.
//!
//! ```rust
//! use relweave_query::Pagination;
//! use relweave_query::sql::DatabaseType;
//!
//! let pagination = Pagination::new().skip(10).take(20);
//! assert_eq!(pagination.to_sql(DatabaseType::PostgreSQL), "LIMIT 20 OFFSET 10");
//!
//! let page_3 = Pagination::page(3, 25);
//! assert_eq!(page_3.skip, Some(50));
//! ```
//!
//! LIMIT and OFFSET apply to the joined rows, not to root entities: a root
//! with three posts occupies three rows of the limit.

use std::fmt::Write;

use crate::sql::DatabaseType;

/// Pagination configuration for queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Number of records to skip.
    pub skip: Option<u64>,
    /// Maximum number of records to take.
    pub take: Option<u64>,
}

impl Pagination {
    /// Create a new pagination with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of records to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the maximum number of records to take.
    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// First `n` rows.
    pub fn first(n: u64) -> Self {
        Self::new().take(n)
    }

    /// 1-indexed page of `size` rows.
    pub fn page(page: u64, size: u64) -> Self {
        Self::new().skip(page.saturating_sub(1).saturating_mul(size)).take(size)
    }

    /// Check if pagination is specified.
    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.take.is_none()
    }

    /// Generate the LIMIT/OFFSET clause.
    pub fn to_sql(&self, db_type: DatabaseType) -> String {
        let mut sql = String::with_capacity(48);
        self.write_sql(db_type, &mut sql);
        sql
    }

    /// Write the LIMIT/OFFSET clause to a buffer.
    ///
    /// MySQL and SQLite reject a bare OFFSET, so an unbounded LIMIT is
    /// written in front of it there.
    pub fn write_sql(&self, db_type: DatabaseType, buffer: &mut String) {
        let take = match (self.take, self.skip, db_type) {
            (Some(take), _, _) => Some(take.to_string()),
            (None, Some(_), DatabaseType::SQLite) => Some("-1".to_string()),
            (None, Some(_), DatabaseType::MySQL) => Some(u64::MAX.to_string()),
            (None, _, _) => None,
        };

        if let Some(take) = take {
            let _ = write!(buffer, "LIMIT {}", take);
        }
        if let Some(skip) = self.skip {
            if !buffer.is_empty() && !buffer.ends_with(' ') {
                buffer.push(' ');
            }
            let _ = write!(buffer, "OFFSET {}", skip);
        }
    }
}
