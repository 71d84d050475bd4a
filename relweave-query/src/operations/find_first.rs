//! FindFirst operation for querying the first matching root entity.

use smol_str::SmolStr;
use std::sync::Arc;

use crate::config::QueryConfig;
use crate::error::{ErrorCode, QueryError, QueryResult};
use crate::filter::Filter;
use crate::metadata::EntityCatalog;
use crate::planner::{JoinPlanner, QueryPlan};
use crate::record::{FromRecord, Record};
use crate::relations::{QueryRequest, RelationRequest};
use crate::traits::QueryEngine;
use crate::types::OrderBy;

/// A query operation that finds the first matching root entity.
///
/// Without relations the query carries `LIMIT 1`. With relations the limit
/// would cut off the joined rows of the first entity, so the full result is
/// hydrated and the first record kept.
///
/// # Example
///
/// ```rust,ignore
/// let user = client
///     .entity("User")
///     .find_first()
///     .r#where(Filter::contains("email", "@example.com"))
///     .with("posts")
///     .exec()
///     .await?;
/// ```
pub struct FindFirstOperation<E: QueryEngine> {
    engine: E,
    catalog: Arc<EntityCatalog>,
    config: QueryConfig,
    request: QueryRequest,
    skip: u64,
}

impl<E: QueryEngine> FindFirstOperation<E> {
    /// Create a new FindFirst operation.
    pub fn new(
        engine: E,
        catalog: Arc<EntityCatalog>,
        config: QueryConfig,
        entity: impl Into<SmolStr>,
    ) -> Self {
        Self {
            engine,
            catalog,
            config,
            request: QueryRequest::new(entity),
            skip: 0,
        }
    }

    /// Add a filter condition on the root query.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.request = self.request.r#where(filter);
        self
    }

    /// Set the order by clause.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.request = self.request.order_by(order);
        self
    }

    /// Skip a number of root entities.
    pub fn skip(mut self, n: u64) -> Self {
        self.skip = n;
        self
    }

    /// Load a relation.
    pub fn with(mut self, relation: impl Into<RelationRequest>) -> Self {
        self.request = self.request.with(relation);
        self
    }

    /// Load a relation configured by `f`.
    pub fn with_fn(
        mut self,
        relation: impl Into<SmolStr>,
        f: impl FnOnce(RelationRequest) -> RelationRequest,
    ) -> Self {
        self.request = self.request.with_fn(relation, f);
        self
    }

    /// Include soft-deleted root entities.
    pub fn with_trashed(mut self) -> Self {
        self.request = self.request.with_trashed();
        self
    }

    // Root rows and root entities coincide only when nothing is joined.
    fn limited(&self) -> bool {
        self.request.with.is_empty()
    }

    fn final_request(&self) -> QueryRequest {
        if self.limited() {
            let request = self.request.clone().take(1);
            if self.skip > 0 {
                request.skip(self.skip)
            } else {
                request
            }
        } else {
            self.request.clone()
        }
    }

    /// Plan the query without running it.
    pub fn build_plan(&self) -> QueryResult<QueryPlan> {
        JoinPlanner::new(&self.catalog, &self.config).plan(&self.final_request())
    }

    /// Execute the query and return the first record, if any.
    pub async fn exec(self) -> QueryResult<Option<Record>> {
        let request = self.final_request();
        let records = super::fetch(&self.engine, &self.catalog, &self.config, &request).await?;
        let skip = if self.limited() { 0 } else { self.skip };
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        Ok(records.into_iter().nth(skip))
    }

    /// Execute the query, failing when nothing matches.
    pub async fn exec_required(self) -> QueryResult<Record> {
        let entity = self.request.entity.clone();
        self.exec().await?.ok_or_else(|| {
            QueryError::new(
                ErrorCode::RecordNotFound,
                format!("no {} matched the query", entity),
            )
            .with_entity(entity.as_str())
        })
    }

    /// Execute the query and convert the record.
    pub async fn exec_as<T: FromRecord>(self) -> QueryResult<Option<T>> {
        self.exec().await?.map(T::from_record).transpose()
    }
}
