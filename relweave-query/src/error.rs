//! Error types for planning, execution and hydration.
//!
//! Every failure carries:
//! - an [`ErrorCode`] for programmatic handling
//! - an [`ErrorContext`] naming the entity, field and SQL involved
//! - suggestions for fixing the problem
//!
//! # Error Codes
//!
//! Error codes follow a pattern: R{category}{number}
//! - 1xxx: Query errors (missing relation, resolution, invalid include)
//! - 5xxx: Execution errors (driver boundary)
//! - 6xxx: Data errors (codec failures)
//! - 7xxx: Configuration and metadata errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use relweave_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::unresolved_segment("users/posts", "posts");
//! assert_eq!(err.code, ErrorCode::PathResolution);
//! assert!(err.to_string().contains("posts"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Query errors (1xxx)
    /// No root entity matched a unique lookup (R1000).
    RecordNotFound = 1000,
    /// A required cardinality-one relation had no matching row (R1001).
    RelationNotFound = 1001,
    /// A cardinality-one relation produced more than one entity (R1002).
    NotUnique = 1002,
    /// Invalid filter or where clause (R1003).
    InvalidFilter = 1003,
    /// Unknown relation name (R1004).
    InvalidRelation = 1004,
    /// A relation path segment is not registered (R1005).
    PathResolution = 1005,
    /// A column is not part of the resolved table occurrence (R1006).
    UnknownColumn = 1006,
    /// Unsupported modifier on a nested relation request (R1007).
    InvalidInclude = 1007,
    /// Ordering that would break root grouping (R1008).
    InvalidOrdering = 1008,

    // Query execution errors (5xxx)
    /// General database error (R5005).
    DatabaseError = 5005,

    // Data errors (6xxx)
    /// Invalid data type (R6001).
    InvalidDataType = 6001,
    /// Deserialization error (R6003).
    DeserializationError = 6003,

    // Configuration errors (7xxx)
    /// Invalid configuration (R7001).
    InvalidConfiguration = 7001,
    /// Inconsistent entity metadata (R7002).
    InvalidMetadata = 7002,

    // Internal errors (9xxx)
    /// Internal error (R9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "R1001").
    pub fn code(&self) -> String {
        format!("R{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::RelationNotFound => "Required relation not found",
            Self::NotUnique => "Multiple entities for a single-valued relation",
            Self::InvalidFilter => "Invalid filter condition",
            Self::InvalidRelation => "Unknown relation",
            Self::PathResolution => "Unresolved relation path",
            Self::UnknownColumn => "Unknown column",
            Self::InvalidInclude => "Invalid nested relation request",
            Self::InvalidOrdering => "Invalid ordering",
            Self::DatabaseError => "Database error",
            Self::InvalidDataType => "Invalid data type",
            Self::DeserializationError => "Deserialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::InvalidMetadata => "Invalid entity metadata",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The entity involved.
    pub entity: Option<String>,
    /// The field, column or relation involved.
    pub field: Option<String>,
    /// The SQL query (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur during query operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the entity.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.context.entity = Some(entity.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL query.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// No entity with the requested id exists.
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        let entity = entity.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("{} with id {} was not found", entity, id),
        )
        .with_entity(&entity)
        .with_suggestion("Use find_first() to get an Option instead of an error")
    }

    /// A required cardinality-one relation resolved to no row.
    pub fn relation_not_found(
        entity: impl Into<String>,
        id: impl fmt::Display,
        relation: impl Into<String>,
    ) -> Self {
        let entity = entity.into();
        let relation = relation.into();
        Self::new(
            ErrorCode::RelationNotFound,
            format!("{} with id {} has no related `{}`", entity, id, relation),
        )
        .with_entity(&entity)
        .with_field(&relation)
        .with_code_suggestion(
            "Treat the relation as optional for this query",
            format!(".with(RelationRequest::new(\"{}\").optional())", relation),
        )
    }

    /// A cardinality-one relation received a second, different entity.
    pub fn not_unique_relation(entity: impl Into<String>, relation: impl Into<String>) -> Self {
        let entity = entity.into();
        let relation = relation.into();
        Self::new(
            ErrorCode::NotUnique,
            format!(
                "relation `{}` on {} is single-valued but matched more than one row",
                relation, entity
            ),
        )
        .with_entity(&entity)
        .with_field(&relation)
        .with_suggestion("Declare the relation as has_many if several rows can match")
        .with_help("Set `to_one_conflict = \"last_write_wins\"` to keep the last match instead")
    }

    /// Unknown relation name passed to `with`.
    pub fn invalid_relation(
        entity: impl Into<String>,
        relation: impl Into<String>,
        valid: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        let entity = entity.into();
        let relation = relation.into();
        let valid: Vec<String> = valid.into_iter().map(|v| v.as_ref().to_string()).collect();
        let listed = if valid.is_empty() {
            "none".to_string()
        } else {
            valid.join(", ")
        };
        Self::new(
            ErrorCode::InvalidRelation,
            format!(
                "{} has no relation `{}` (valid relations: {})",
                entity, relation, listed
            ),
        )
        .with_entity(&entity)
        .with_field(&relation)
    }

    /// A path segment was used before it was registered.
    pub fn unresolved_segment(path: impl Into<String>, segment: impl Into<String>) -> Self {
        let path = path.into();
        let segment = segment.into();
        Self::new(
            ErrorCode::PathResolution,
            format!("cannot resolve `{}`: segment `{}` is not registered", path, segment),
        )
        .with_field(&segment)
        .with_suggestion("Load the relation with `with(...)` before referencing it")
    }

    /// A `..` segment tried to leave the root.
    pub fn path_above_root(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::PathResolution,
            format!("cannot resolve `{}`: `..` navigates above the root", path),
        )
    }

    /// Column not present on the resolved table occurrence.
    pub fn unknown_column(path: impl Into<String>, column: impl Into<String>) -> Self {
        let path = path.into();
        let column = column.into();
        Self::new(
            ErrorCode::UnknownColumn,
            format!("`{}` has no column `{}`", path, column),
        )
        .with_field(&column)
    }

    /// Modifier that is only meaningful on the root query.
    pub fn nested_modifier(relation: impl Into<String>, modifier: &str) -> Self {
        let relation = relation.into();
        Self::new(
            ErrorCode::InvalidInclude,
            format!(
                "`{}` cannot be applied to nested relation `{}`; it only affects the root query",
                modifier, relation
            ),
        )
        .with_field(&relation)
        .with_help("Set `nested_modifiers = \"ignore\"` to accept and drop nested modifiers")
    }

    /// Ordering that would interleave rows of different root entities.
    pub fn invalid_ordering(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(
            ErrorCode::InvalidOrdering,
            format!("cannot order by `{}`: only root columns may be used", column),
        )
        .with_field(&column)
        .with_help("Ordering by a related column would split the rows of one root entity")
    }

    /// Invalid filter construction.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFilter, message.into())
    }

    /// Inconsistent entity metadata.
    pub fn invalid_metadata(entity: impl Into<String>, message: impl Into<String>) -> Self {
        let entity = entity.into();
        let message = message.into();
        Self::new(
            ErrorCode::InvalidMetadata,
            format!("invalid metadata for {}: {}", entity, message),
        )
        .with_entity(&entity)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::DeserializationError,
            format!("Failed to deserialize result: {}", message),
        )
        .with_suggestion("Check that the entity descriptor matches the database schema")
    }

    /// Create an invalid data type error.
    pub fn invalid_data_type(column: impl Into<String>, message: impl Into<String>) -> Self {
        let column = column.into();
        let message = message.into();
        Self::new(
            ErrorCode::InvalidDataType,
            format!("invalid value for `{}`: {}", column, message),
        )
        .with_field(&column)
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message.into())
            .with_suggestion("Check the database logs for more details")
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
    }

    // ============== Error Checks ==============

    /// Check if this is a missing record or missing required relation.
    pub fn is_not_found(&self) -> bool {
        matches!(self.code, ErrorCode::RecordNotFound | ErrorCode::RelationNotFound)
    }

    /// Check if this error came from path or column resolution.
    pub fn is_resolution_error(&self) -> bool {
        matches!(self.code, ErrorCode::PathResolution | ErrorCode::UnknownColumn)
    }

    /// Check if this error came from decoding row data.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidDataType | ErrorCode::DeserializationError
        )
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref entity) = self.context.entity {
            output.push_str(&format!("  → Entity: {}\n", entity));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }

        // SQL (truncated if too long)
        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.chars().count() > 200 {
                format!("{}...", sql.chars().take(200).collect::<String>())
            } else {
                sql.clone()
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!(
                        "     ```\n     {}\n     ```\n",
                        code.replace('\n', "\n     ")
                    ));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}
