//! Query builder entry point.

use smol_str::SmolStr;
use std::sync::Arc;

use crate::config::{QueryConfig, RelweaveConfig};
use crate::error::QueryResult;
use crate::metadata::EntityCatalog;
use crate::operations::*;
use crate::planner::{JoinPlanner, QueryPlan};
use crate::record::Record;
use crate::relations::QueryRequest;
use crate::traits::QueryEngine;
use crate::value::Value;

/// The main query builder: an engine, the entity catalog and settings.
///
/// ```rust,ignore
/// let client = QueryBuilder::new(engine, Arc::new(catalog), QueryConfig::default());
/// let users = client.entity("User").find_many().with("posts").exec().await?;
/// ```
pub struct QueryBuilder<E: QueryEngine> {
    engine: E,
    catalog: Arc<EntityCatalog>,
    config: QueryConfig,
}

impl<E: QueryEngine> QueryBuilder<E> {
    /// Create a new query builder.
    pub fn new(engine: E, catalog: Arc<EntityCatalog>, config: QueryConfig) -> Self {
        Self {
            engine,
            catalog,
            config,
        }
    }

    /// Create a query builder from a loaded `relweave.toml`.
    pub fn from_config(engine: E, catalog: Arc<EntityCatalog>, config: &RelweaveConfig) -> Self {
        Self::new(engine, catalog, config.query)
    }

    /// Settings in effect.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Registered entities.
    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    /// Operations on one entity.
    pub fn entity(&self, name: impl Into<SmolStr>) -> EntityQuery<E> {
        EntityQuery {
            builder: self.clone(),
            entity: name.into(),
        }
    }

    /// Plan a prebuilt request.
    pub fn plan(&self, request: &QueryRequest) -> QueryResult<QueryPlan> {
        JoinPlanner::new(&self.catalog, &self.config).plan(request)
    }

    /// Plan, execute and hydrate a prebuilt request.
    pub async fn execute(&self, request: &QueryRequest) -> QueryResult<Vec<Record>> {
        crate::operations::fetch(&self.engine, &self.catalog, &self.config, request).await
    }
}

impl<E: QueryEngine> Clone for QueryBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            catalog: Arc::clone(&self.catalog),
            config: self.config,
        }
    }
}

/// Operations scoped to one root entity.
pub struct EntityQuery<E: QueryEngine> {
    builder: QueryBuilder<E>,
    entity: SmolStr,
}

impl<E: QueryEngine> EntityQuery<E> {
    /// Start a find_many query.
    pub fn find_many(&self) -> FindManyOperation<E> {
        FindManyOperation::new(
            self.builder.engine.clone(),
            Arc::clone(&self.builder.catalog),
            self.builder.config,
            self.entity.clone(),
        )
    }

    /// Start a find_first query.
    pub fn find_first(&self) -> FindFirstOperation<E> {
        FindFirstOperation::new(
            self.builder.engine.clone(),
            Arc::clone(&self.builder.catalog),
            self.builder.config,
            self.entity.clone(),
        )
    }

    /// Start a find_unique query for `id`.
    pub fn find_unique(&self, id: impl Into<Value>) -> FindUniqueOperation<E> {
        FindUniqueOperation::new(
            self.builder.engine.clone(),
            Arc::clone(&self.builder.catalog),
            self.builder.config,
            self.entity.clone(),
            id,
        )
    }
}
