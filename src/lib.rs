//! # relweave
//!
//! Load an entity together with a tree of related entities in one query.
//!
//! relweave plans a request such as "users with their posts, and each
//! post's writer" into a single `SELECT` with one `LEFT JOIN` per
//! relation, runs it through a [`QueryEngine`](prelude::QueryEngine) you
//! provide, and folds the joined rows back into nested records.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use relweave::prelude::*;
//! use std::sync::Arc;
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
//!             .column("author", ScalarCodec::Int)
//!             .column("title", ScalarCodec::Text),
//!     )
//!     .build()?;
//!
//! let client = QueryBuilder::new(engine, Arc::new(catalog), QueryConfig::default());
//! let users = client
//!     .entity("User")
//!     .find_many()
//!     .r#where(Filter::starts_with("name", "A"))
//!     .with_fn("posts", |p| p.r#where(Filter::contains("title", "rust")))
//!     .exec()
//!     .await?;
//! ```
//!
//! ## Configuration
//!
//! Settings can be read from a `relweave.toml`:
//!
//! ```toml
//! [query]
//! dialect = "postgresql"
//! stable_ordering = true
//! nested_modifiers = "reject"
//! to_one_conflict = "error"
//! ```

pub use relweave_query as query;

pub use relweave_query::{
    EntityCatalog, EntityDescriptor, ErrorCode, Filter, QueryBuilder, QueryConfig, QueryError,
    QueryRequest, QueryResult, Record, RelationRequest, RelationSpec, RelweaveConfig,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use relweave_query::prelude::*;
    pub use relweave_query::{QueryPlan, RelweaveConfig};
}
