//! # relweave-query
//!
//! Join planning and nested row hydration for the relweave ORM.
//!
//! A [`QueryRequest`] names a root entity, a filter on it and a tree of
//! relations to load. The [`JoinPlanner`] turns the whole tree into one
//! `SELECT` with a `LEFT JOIN` per relation, giving every table occurrence
//! a collision-free alias. The [`Hydrator`] folds the returned rows back
//! into nested [`Record`]s.
//!
//! ## Relation paths
//!
//! Columns of joined tables are addressed by relation path. Paths are
//! relative to where a filter is attached and may climb with `..`:
//!
//! ```rust
//! use relweave_query::{CompareOp, Filter, QueryRequest};
//!
//! let request = QueryRequest::new("User")
//!     .with("profile")
//!     .with_fn("posts", |posts| {
//!         posts.r#where(Filter::column("title", CompareOp::Ne, "../profile/bio"))
//!     })
//!     .r#where(Filter::starts_with("name", "A"));
//! ```
//!
//! ## Planning
//!
//! ```rust
//! use relweave_query::{
//!     EntityCatalog, EntityDescriptor, JoinPlanner, QueryConfig, QueryRequest,
//!     RelationSpec, ScalarCodec,
//! };
//!
//! let catalog = EntityCatalog::builder()
//!     .entity(
//!         EntityDescriptor::new("User", "users")
//!             .column("id", ScalarCodec::Int)
//!             .column("name", ScalarCodec::Text)
//!             .relation(RelationSpec::has_many("posts", "Post", "author")),
//!     )
//!     .entity(
//!         EntityDescriptor::new("Post", "posts")
//!             .column("id", ScalarCodec::Int)
//!             .column("author", ScalarCodec::Int),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let config = QueryConfig::default();
//! let plan = JoinPlanner::new(&catalog, &config)
//!     .plan(&QueryRequest::new("User").with("posts"))
//!     .unwrap();
//!
//! assert_eq!(
//!     plan.sql(),
//!     "SELECT users.id AS usersid, users.name AS usersname, t1_.id AS t1_id, \
//!      t1_.author AS t1_author FROM users LEFT JOIN posts AS t1_ ON users.id = t1_.author \
//!      ORDER BY users.id ASC, t1_.id ASC"
//! );
//! ```
//!
//! ## Errors
//!
//! Every fallible operation returns [`QueryResult`]. Errors carry an
//! [`ErrorCode`] and, where it helps, suggestions:
//!
//! ```rust
//! use relweave_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::not_found("User", 42);
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! ```

pub mod alias;
pub mod binding;
pub mod config;
pub mod error;
pub mod filter;
pub mod hydrate;
pub mod logging;
pub mod metadata;
pub mod operations;
pub mod pagination;
pub mod planner;
pub mod query;
pub mod record;
pub mod relations;
pub mod row;
pub mod sql;
pub mod traits;
pub mod types;
pub mod value;

pub use alias::{AliasNode, AliasRegistry, NodeId};
pub use binding::LocalBinding;
pub use config::{NestedModifiers, QueryConfig, RelweaveConfig};
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use filter::{CompareOp, Filter};
pub use hydrate::{HydrateIter, Hydrator};
pub use metadata::{ColumnDescriptor, EntityCatalog, EntityCatalogBuilder, EntityDescriptor, ScalarCodec};
pub use operations::{FindFirstOperation, FindManyOperation, FindUniqueOperation};
pub use pagination::Pagination;
pub use planner::{JoinPlanner, PlanNode, PlannedColumn, QueryPlan};
pub use query::{EntityQuery, QueryBuilder};
pub use record::{FromRecord, FromValue, Record, Related};
pub use relations::{
    Cardinality, JoinTableSpec, QueryRequest, RelationKind, RelationRequest, RelationSpec,
    ToOneConflict,
};
pub use row::{Row, RowError, RowRef};
pub use sql::{DatabaseType, SqlBuilder};
pub use traits::{BoxFuture, QueryEngine};
pub use types::{NullsOrder, OrderBy, OrderByField, SortOrder};
pub use value::{IdKey, Value};

// Re-export logging utilities
pub use logging::{
    get_log_format, get_log_level, init as init_logging, init_debug, init_with_level,
    is_debug_enabled,
};

#[doc(hidden)]
pub use tracing as __tracing;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::QueryConfig;
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::{CompareOp, Filter};
    pub use crate::metadata::{EntityCatalog, EntityDescriptor, ScalarCodec};
    pub use crate::operations::*;
    pub use crate::query::QueryBuilder;
    pub use crate::record::{FromRecord, Record};
    pub use crate::relations::{JoinTableSpec, QueryRequest, RelationRequest, RelationSpec};
    pub use crate::row::{Row, RowRef};
    pub use crate::traits::QueryEngine;
    pub use crate::types::{OrderBy, OrderByField, SortOrder};
    pub use crate::value::Value;
}
