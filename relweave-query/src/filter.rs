//! Filter types for building WHERE and ON predicates.
//!
//! Every leaf names its column with a relative path (`title`, `../name`,
//! `author/name`) that is resolved against the [`LocalBinding`] of the
//! relation the filter is attached to. Filters are rendered into SQL at plan
//! time, never evaluated in-process.

use std::fmt;

use crate::binding::LocalBinding;
use crate::error::{QueryError, QueryResult};
use crate::sql::SqlBuilder;
use crate::value::Value;

/// Comparison operator shared by value and column comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl CompareOp {
    /// SQL operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A complete filter that can be converted to SQL.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter (always true).
    #[default]
    None,

    /// Equals comparison.
    Equals(String, Value),
    /// Not equals comparison.
    NotEquals(String, Value),

    /// Less than comparison.
    Lt(String, Value),
    /// Less than or equal comparison.
    Lte(String, Value),
    /// Greater than comparison.
    Gt(String, Value),
    /// Greater than or equal comparison.
    Gte(String, Value),

    /// In a list of values.
    In(String, Vec<Value>),
    /// Not in a list of values.
    NotIn(String, Vec<Value>),

    /// Contains (LIKE %value%).
    Contains(String, Value),
    /// Starts with (LIKE value%).
    StartsWith(String, Value),
    /// Ends with (LIKE %value).
    EndsWith(String, Value),

    /// Is null check.
    IsNull(String),
    /// Is not null check.
    IsNotNull(String),

    /// Compare two columns.
    Column(String, CompareOp, String),

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
    /// Logical NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn none() -> Self {
        Self::None
    }

    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Compare a column against a value.
    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        let column = column.into();
        let value = value.into();
        match op {
            CompareOp::Eq => Self::Equals(column, value),
            CompareOp::Ne => Self::NotEquals(column, value),
            CompareOp::Lt => Self::Lt(column, value),
            CompareOp::Lte => Self::Lte(column, value),
            CompareOp::Gt => Self::Gt(column, value),
            CompareOp::Gte => Self::Gte(column, value),
        }
    }

    /// `column = value`
    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals(column.into(), value.into())
    }

    /// `column <> value`
    pub fn not_equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::NotEquals(column.into(), value.into())
    }

    /// `column IN (...)`
    pub fn in_list(column: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    /// `column NOT IN (...)`
    pub fn not_in(column: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::NotIn(column.into(), values.into_iter().map(Into::into).collect())
    }

    /// `column LIKE %value%`
    pub fn contains(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Contains(column.into(), value.into())
    }

    /// `column LIKE value%`
    pub fn starts_with(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::StartsWith(column.into(), value.into())
    }

    /// `column LIKE %value`
    pub fn ends_with(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::EndsWith(column.into(), value.into())
    }

    /// `column IS NULL`
    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull(column.into())
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::IsNotNull(column.into())
    }

    /// Compare two columns, both given as relative paths.
    pub fn column(column: impl Into<String>, op: CompareOp, other: impl Into<String>) -> Self {
        Self::Column(column.into(), op, other.into())
    }

    /// Create an AND filter.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.swap_remove(0),
            _ => Self::And(filters),
        }
    }

    /// Create an OR filter.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.swap_remove(0),
            _ => Self::Or(filters),
        }
    }

    /// Create a NOT filter.
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Combine with another filter using OR.
    pub fn or_else(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::Or(mut filters) => {
                filters.push(other);
                Self::Or(filters)
            }
            _ => Self::Or(vec![self, other]),
        }
    }

    /// Every column path mentioned by this filter, in rendering order.
    pub fn column_paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::None => {}
            Self::Equals(col, _)
            | Self::NotEquals(col, _)
            | Self::Lt(col, _)
            | Self::Lte(col, _)
            | Self::Gt(col, _)
            | Self::Gte(col, _)
            | Self::In(col, _)
            | Self::NotIn(col, _)
            | Self::Contains(col, _)
            | Self::StartsWith(col, _)
            | Self::EndsWith(col, _)
            | Self::IsNull(col)
            | Self::IsNotNull(col) => out.push(col),
            Self::Column(left, _, right) => {
                out.push(left);
                out.push(right);
            }
            Self::And(filters) | Self::Or(filters) => {
                for filter in filters {
                    filter.collect_paths(out);
                }
            }
            Self::Not(filter) => filter.collect_paths(out),
        }
    }

    /// Render this filter, resolving column paths through `binding`.
    ///
    /// Composite filters are wrapped in parentheses so they can be ANDed into
    /// an existing clause without precedence surprises.
    pub fn write_sql(&self, binding: &LocalBinding<'_>, builder: &mut SqlBuilder) -> QueryResult<()> {
        match self {
            Self::None => {
                builder.push("TRUE");
            }

            Self::Equals(col, val) if val.is_null() => {
                builder.push(binding.qualified(col)?).push(" IS NULL");
            }
            Self::NotEquals(col, val) if val.is_null() => {
                builder.push(binding.qualified(col)?).push(" IS NOT NULL");
            }
            Self::Equals(col, val) => write_compare(binding, builder, col, CompareOp::Eq, val)?,
            Self::NotEquals(col, val) => write_compare(binding, builder, col, CompareOp::Ne, val)?,
            Self::Lt(col, val) => write_compare(binding, builder, col, CompareOp::Lt, val)?,
            Self::Lte(col, val) => write_compare(binding, builder, col, CompareOp::Lte, val)?,
            Self::Gt(col, val) => write_compare(binding, builder, col, CompareOp::Gt, val)?,
            Self::Gte(col, val) => write_compare(binding, builder, col, CompareOp::Gte, val)?,

            Self::In(col, values) => write_list(binding, builder, col, "IN", "FALSE", values)?,
            Self::NotIn(col, values) => {
                write_list(binding, builder, col, "NOT IN", "TRUE", values)?
            }

            Self::Contains(col, val) => write_like(binding, builder, col, val, "%", "%")?,
            Self::StartsWith(col, val) => write_like(binding, builder, col, val, "", "%")?,
            Self::EndsWith(col, val) => write_like(binding, builder, col, val, "%", "")?,

            Self::IsNull(col) => {
                builder.push(binding.qualified(col)?).push(" IS NULL");
            }
            Self::IsNotNull(col) => {
                builder.push(binding.qualified(col)?).push(" IS NOT NULL");
            }

            Self::Column(left, op, right) => {
                let left = binding.qualified(left)?;
                let right = binding.qualified(right)?;
                builder
                    .push(left)
                    .push(" ")
                    .push(op.as_sql())
                    .push(" ")
                    .push(right);
            }

            Self::And(filters) => write_group(binding, builder, filters, " AND ", "TRUE")?,
            Self::Or(filters) => write_group(binding, builder, filters, " OR ", "FALSE")?,
            Self::Not(filter) => {
                builder.push("NOT (");
                filter.write_sql(binding, builder)?;
                builder.push(")");
            }
        }
        Ok(())
    }
}

fn write_compare(
    binding: &LocalBinding<'_>,
    builder: &mut SqlBuilder,
    column: &str,
    op: CompareOp,
    value: &Value,
) -> QueryResult<()> {
    let column = binding.qualified(column)?;
    builder
        .push(column)
        .push(" ")
        .push(op.as_sql())
        .push(" ")
        .push_param(value.clone());
    Ok(())
}

fn write_list(
    binding: &LocalBinding<'_>,
    builder: &mut SqlBuilder,
    column: &str,
    keyword: &str,
    empty: &str,
    values: &[Value],
) -> QueryResult<()> {
    // Resolve even when the list is empty so bad paths still fail.
    let column = binding.qualified(column)?;
    if values.is_empty() {
        builder.push(empty);
        return Ok(());
    }
    builder.push(column).push(" ").push(keyword).push(" (");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push_param(value.clone());
    }
    builder.push(")");
    Ok(())
}

fn write_like(
    binding: &LocalBinding<'_>,
    builder: &mut SqlBuilder,
    column: &str,
    value: &Value,
    prefix: &str,
    suffix: &str,
) -> QueryResult<()> {
    let Value::String(text) = value else {
        return Err(QueryError::invalid_filter(format!(
            "pattern match on `{}` needs a string, got {}",
            column,
            value.kind()
        )));
    };
    let column = binding.qualified(column)?;
    builder
        .push(column)
        .push(" LIKE ")
        .push_param(format!("{}{}{}", prefix, text, suffix));
    Ok(())
}

fn write_group(
    binding: &LocalBinding<'_>,
    builder: &mut SqlBuilder,
    filters: &[Filter],
    separator: &str,
    empty: &str,
) -> QueryResult<()> {
    if filters.is_empty() {
        builder.push(empty);
        return Ok(());
    }
    builder.push("(");
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            builder.push(separator);
        }
        filter.write_sql(binding, builder)?;
    }
    builder.push(")");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasRegistry;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    fn registry() -> AliasRegistry {
        let mut registry = AliasRegistry::new("users", ["id", "name", "deleted_at"]);
        registry.add_relation("users/posts", ["id", "author", "title", "score"]).unwrap();
        registry.add_relation("users/profile", ["id", "bio"]).unwrap();
        registry
    }

    fn render(filter: &Filter, path: &str) -> (String, Vec<Value>) {
        let registry = registry();
        let binding = LocalBinding::new(&registry, path);
        let mut builder = SqlBuilder::postgres();
        filter.write_sql(&binding, &mut builder).unwrap();
        builder.build()
    }

    #[test]
    fn test_scalar_compare() {
        let (sql, params) = render(&Filter::equals("title", "A1"), "users/posts");
        assert_eq!(sql, "t1_.title = $1");
        assert_eq!(params, vec![Value::from("A1")]);

        let (sql, _) = render(&Filter::compare("score", CompareOp::Gte, 3), "users/posts");
        assert_eq!(sql, "t1_.score >= $1");
    }

    #[test]
    fn test_null_equality_becomes_is_null() {
        let (sql, params) = render(&Filter::equals("deleted_at", Value::Null), "users");
        assert_eq!(sql, "users.deleted_at IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn test_parent_and_sibling_paths() {
        let filter = Filter::and([
            Filter::column("author", CompareOp::Eq, "../id"),
            Filter::is_not_null("../profile/bio"),
        ]);
        let (sql, _) = render(&filter, "users/posts");
        assert_eq!(sql, "(t1_.author = users.id AND t2_.bio IS NOT NULL)");
    }

    #[test]
    fn test_lists() {
        let (sql, params) = render(&Filter::in_list("id", [1i64, 2, 3]), "users");
        assert_eq!(sql, "users.id IN ($1, $2, $3)");
        assert_eq!(params.len(), 3);

        let (sql, _) = render(&Filter::in_list("id", Vec::<i64>::new()), "users");
        assert_eq!(sql, "FALSE");
        let (sql, _) = render(&Filter::not_in("id", Vec::<i64>::new()), "users");
        assert_eq!(sql, "TRUE");
    }

    #[test]
    fn test_like_patterns() {
        let (sql, params) = render(&Filter::contains("name", "nn"), "users");
        assert_eq!(sql, "users.name LIKE $1");
        assert_eq!(params, vec![Value::from("%nn%")]);

        let (_, params) = render(&Filter::starts_with("name", "A"), "users");
        assert_eq!(params, vec![Value::from("A%")]);
    }

    #[test]
    fn test_like_needs_string() {
        let registry = registry();
        let binding = LocalBinding::root(&registry);
        let mut builder = SqlBuilder::postgres();
        let err = Filter::contains("name", 5).write_sql(&binding, &mut builder).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFilter);
    }

    #[test]
    fn test_nested_groups_keep_precedence() {
        let filter = Filter::or([
            Filter::equals("name", "A"),
            Filter::and([Filter::equals("name", "B"), Filter::not(Filter::is_null("deleted_at"))]),
        ]);
        let (sql, params) = render(&filter, "users");
        assert_eq!(
            sql,
            "(users.name = $1 OR (users.name = $2 AND NOT (users.deleted_at IS NULL)))"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_combinators_drop_empty() {
        assert!(Filter::and([Filter::none(), Filter::none()]).is_none());
        assert_eq!(
            Filter::and([Filter::none(), Filter::is_null("name")]),
            Filter::is_null("name")
        );
        let chained = Filter::is_null("a").and_then(Filter::is_null("b")).and_then(Filter::is_null("c"));
        assert!(matches!(chained, Filter::And(ref fs) if fs.len() == 3));
    }

    #[test]
    fn test_column_paths() {
        let filter = Filter::and([
            Filter::column("author", CompareOp::Eq, "../id"),
            Filter::not(Filter::in_list("score", [1i64])),
        ]);
        assert_eq!(filter.column_paths(), vec!["author", "../id", "score"]);
    }

    #[test]
    fn test_unregistered_relation_fails() {
        let registry = registry();
        let binding = LocalBinding::root(&registry);
        let mut builder = SqlBuilder::postgres();
        let err = Filter::equals("comments/body", "x")
            .write_sql(&binding, &mut builder)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PathResolution);
    }

    #[test]
    fn test_empty_list_still_resolves_path() {
        let registry = registry();
        let binding = LocalBinding::root(&registry);
        for filter in [
            Filter::in_list("comments/id", Vec::<i64>::new()),
            Filter::not_in("comments/id", Vec::<i64>::new()),
        ] {
            let mut builder = SqlBuilder::postgres();
            let err = filter.write_sql(&binding, &mut builder).unwrap_err();
            assert_eq!(err.code, ErrorCode::PathResolution);
        }
    }
}
