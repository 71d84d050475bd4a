//! FindUnique operation for querying a single root entity by id.

use smol_str::SmolStr;
use std::sync::Arc;

use crate::config::QueryConfig;
use crate::error::{QueryError, QueryResult};
use crate::filter::Filter;
use crate::metadata::EntityCatalog;
use crate::planner::{JoinPlanner, QueryPlan};
use crate::record::{FromRecord, Record};
use crate::relations::{QueryRequest, RelationRequest};
use crate::traits::QueryEngine;
use crate::value::Value;

/// A query operation that finds one root entity by its id.
///
/// # Example
///
/// ```rust,ignore
/// let user = client
///     .entity("User")
///     .find_unique(1)
///     .with("posts")
///     .exec()
///     .await?;
/// ```
pub struct FindUniqueOperation<E: QueryEngine> {
    engine: E,
    catalog: Arc<EntityCatalog>,
    config: QueryConfig,
    request: QueryRequest,
    id: Value,
}

impl<E: QueryEngine> FindUniqueOperation<E> {
    /// Create a new FindUnique operation.
    pub fn new(
        engine: E,
        catalog: Arc<EntityCatalog>,
        config: QueryConfig,
        entity: impl Into<SmolStr>,
        id: impl Into<Value>,
    ) -> Self {
        Self {
            engine,
            catalog,
            config,
            request: QueryRequest::new(entity),
            id: id.into(),
        }
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

    /// Also find the entity when it is soft-deleted.
    pub fn with_trashed(mut self) -> Self {
        self.request = self.request.with_trashed();
        self
    }

    fn final_request(&self) -> QueryResult<QueryRequest> {
        if self.id.is_null() {
            return Err(QueryError::invalid_filter(format!(
                "find_unique on {} needs a non-null id",
                self.request.entity
            )));
        }
        let entity = self.catalog.entity(&self.request.entity)?;
        Ok(self
            .request
            .clone()
            .r#where(Filter::equals(entity.id_column(), self.id.clone())))
    }

    /// Plan the query without running it.
    pub fn build_plan(&self) -> QueryResult<QueryPlan> {
        JoinPlanner::new(&self.catalog, &self.config).plan(&self.final_request()?)
    }

    /// Execute the query, failing when the id does not exist.
    pub async fn exec(self) -> QueryResult<Record> {
        let entity = self.request.entity.clone();
        let id = self.id.clone();
        self.exec_optional()
            .await?
            .ok_or_else(|| QueryError::not_found(entity.as_str(), id))
    }

    /// Execute the query and return the record if it exists.
    pub async fn exec_optional(self) -> QueryResult<Option<Record>> {
        let request = self.final_request()?;
        let records = super::fetch(&self.engine, &self.catalog, &self.config, &request).await?;
        Ok(records.into_iter().next())
    }

    /// Execute the query and convert the record.
    pub async fn exec_as<T: FromRecord>(self) -> QueryResult<T> {
        T::from_record(self.exec().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::operations::testing::{MockEngine, catalog, user_post};

    fn find_unique(engine: MockEngine, id: i64) -> FindUniqueOperation<MockEngine> {
        FindUniqueOperation::new(engine, catalog(), QueryConfig::default(), "User", id)
    }

    #[test]
    fn test_filters_on_id() {
        let plan = find_unique(MockEngine::default(), 4).with("posts").build_plan().unwrap();
        assert!(plan.sql().contains("WHERE users.id = $1 ORDER BY"));
        assert!(!plan.sql().contains("LIMIT"));
        assert_eq!(plan.params(), &[Value::Int(4)]);
    }

    #[tokio::test]
    async fn test_exec_found() {
        let engine = MockEngine::with_rows(vec![
            user_post(4, "D", Some((8, "D1"))),
            user_post(4, "D", Some((9, "D2"))),
        ]);
        let user = find_unique(engine.clone(), 4).with("posts").exec().await.unwrap();
        assert_eq!(user.id(), &Value::Int(4));
        assert_eq!(user.many("posts").len(), 2);
        assert_eq!(engine.last_params(), vec![Value::Int(4)]);
    }

    #[tokio::test]
    async fn test_exec_not_found() {
        let err = find_unique(MockEngine::default(), 4).exec().await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.message.contains("User with id 4"));

        let none = find_unique(MockEngine::default(), 4).exec_optional().await.unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_null_id_rejected() {
        let op = FindUniqueOperation::new(
            MockEngine::default(),
            catalog(),
            QueryConfig::default(),
            "User",
            Value::Null,
        );
        assert_eq!(op.build_plan().unwrap_err().code, ErrorCode::InvalidFilter);
    }
}
