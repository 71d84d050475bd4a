//! FindMany operation for querying root entities with their relations.

use smol_str::SmolStr;
use std::sync::Arc;

use crate::config::QueryConfig;
use crate::error::QueryResult;
use crate::filter::Filter;
use crate::metadata::EntityCatalog;
use crate::planner::{JoinPlanner, QueryPlan};
use crate::record::{FromRecord, Record};
use crate::relations::{QueryRequest, RelationRequest};
use crate::traits::QueryEngine;
use crate::types::OrderBy;

/// A query operation that finds every matching root entity.
///
/// # Example
///
/// ```rust,ignore
/// let users = client
///     .entity("User")
///     .find_many()
///     .r#where(Filter::contains("email", "@example.com"))
///     .with_fn("posts", |p| p.r#where(Filter::equals("published", true)))
///     .order_by(OrderByField::desc("created_at"))
///     .take(10)
///     .exec()
///     .await?;
/// ```
pub struct FindManyOperation<E: QueryEngine> {
    engine: E,
    catalog: Arc<EntityCatalog>,
    config: QueryConfig,
    request: QueryRequest,
}

impl<E: QueryEngine> FindManyOperation<E> {
    /// Create a new FindMany operation.
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

    /// Skip a number of rows.
    pub fn skip(mut self, n: u64) -> Self {
        self.request = self.request.skip(n);
        self
    }

    /// Take a limited number of rows.
    pub fn take(mut self, n: u64) -> Self {
        self.request = self.request.take(n);
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

    /// The request built so far.
    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    /// Plan the query without running it.
    pub fn build_plan(&self) -> QueryResult<QueryPlan> {
        JoinPlanner::new(&self.catalog, &self.config).plan(&self.request)
    }

    /// Execute the query.
    pub async fn exec(self) -> QueryResult<Vec<Record>> {
        super::fetch(&self.engine, &self.catalog, &self.config, &self.request).await
    }

    /// Execute the query and convert every record.
    pub async fn exec_as<T: FromRecord>(self) -> QueryResult<Vec<T>> {
        self.exec().await?.into_iter().map(T::from_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::filter::CompareOp;
    use crate::operations::testing::{MockEngine, catalog, user_post};
    use crate::types::OrderByField;
    use crate::value::Value;

    fn find_many(engine: MockEngine) -> FindManyOperation<MockEngine> {
        FindManyOperation::new(engine, catalog(), QueryConfig::default(), "User")
    }

    #[test]
    fn test_build_plan() {
        let op = find_many(MockEngine::default())
            .r#where(Filter::equals("name", "A"))
            .order_by(OrderByField::asc("name"))
            .take(5);
        let plan = op.build_plan().unwrap();

        assert_eq!(
            plan.sql(),
            "SELECT users.id AS usersid, users.name AS usersname FROM users \
             WHERE users.name = $1 ORDER BY users.name ASC, users.id ASC LIMIT 5"
        );
        assert_eq!(plan.params(), &[Value::from("A")]);
    }

    #[test]
    fn test_where_is_anded() {
        let op = find_many(MockEngine::default())
            .r#where(Filter::equals("name", "A"))
            .r#where(Filter::compare("id", CompareOp::Gt, 3));
        let sql = op.build_plan().unwrap().sql().to_string();
        assert!(sql.contains("WHERE (users.name = $1 AND users.id > $2)"));
    }

    #[tokio::test]
    async fn test_exec_hydrates_relations() {
        let engine = MockEngine::with_rows(vec![
            user_post(1, "A", Some((1, "A1"))),
            user_post(1, "A", Some((2, "A2"))),
            user_post(2, "B", None),
        ]);
        let users = find_many(engine.clone()).with("posts").exec().await.unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].many("posts").len(), 2);
        assert!(users[1].many("posts").is_empty());
        assert!(engine.last_sql().contains("LEFT JOIN posts AS t1_"));
    }

    #[tokio::test]
    async fn test_exec_as_json() {
        let engine = MockEngine::with_rows(vec![user_post(1, "A", Some((1, "A1")))]);
        let users: Vec<serde_json::Value> = find_many(engine).with("posts").exec_as().await.unwrap();
        assert_eq!(
            users[0],
            serde_json::json!({
                "id": 1,
                "name": "A",
                "posts": [{ "id": 1, "author": 1, "title": "A1" }]
            })
        );
    }

    #[tokio::test]
    async fn test_exec_plan_error_skips_engine() {
        let engine = MockEngine::default();
        let err = find_many(engine.clone()).with("comments").exec().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRelation);
        assert!(engine.last_sql().is_empty());
    }
}
