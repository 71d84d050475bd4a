//! Relation descriptors and relation request trees.
//!
//! [`RelationSpec`] describes how an entity reaches another one (join keys,
//! cardinality, link behavior); [`RelationRequest`] is the caller's ask to
//! load it, optionally filtered and with further relations nested inside.
//!
//! ## Example
//!
//! ```rust
//! use relweave_query::filter::Filter;
//! use relweave_query::relations::{QueryRequest, RelationRequest};
//!
//! let request = QueryRequest::new("User")
//!     .with(RelationRequest::new("posts").r#where(Filter::starts_with("title", "A")))
//!     .with_fn("profile", |p| p.optional());
//!
//! assert_eq!(request.with.len(), 2);
//! ```

mod request;
mod spec;

pub use request::{QueryRequest, RelationRequest};
pub use spec::{Cardinality, JoinTableSpec, RelationKind, RelationSpec, ToOneConflict};
