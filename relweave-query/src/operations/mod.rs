//! Query operations for the fluent API.
//!
//! - `FindManyOperation` - Every matching root entity with its relations
//! - `FindFirstOperation` - The first matching root entity
//! - `FindUniqueOperation` - One root entity by id
//!
//! Each operation owns a [`QueryRequest`], plans it into a single SELECT,
//! runs it through the engine and hydrates the rows.

mod find_first;
mod find_many;
mod find_unique;

pub use find_first::FindFirstOperation;
pub use find_many::FindManyOperation;
pub use find_unique::FindUniqueOperation;

use crate::config::QueryConfig;
use crate::error::QueryResult;
use crate::hydrate::Hydrator;
use crate::metadata::EntityCatalog;
use crate::planner::JoinPlanner;
use crate::record::Record;
use crate::relations::QueryRequest;
use crate::traits::QueryEngine;

/// Plan, execute and hydrate one request.
pub(crate) async fn fetch<E: QueryEngine>(
    engine: &E,
    catalog: &EntityCatalog,
    config: &QueryConfig,
    request: &QueryRequest,
) -> QueryResult<Vec<Record>> {
    let plan = JoinPlanner::new(catalog, config).plan(request)?;
    let rows = engine
        .query_rows(plan.sql(), plan.params().to_vec())
        .await
        .map_err(|e| e.with_context(format!("find {}", request.entity)).with_sql(plan.sql()))?;

    let records = Hydrator::new(&plan, config)
        .hydrate(&rows)
        .map_err(|e| e.with_context(format!("hydrate {}", request.entity)))?;
    crate::relweave_debug!(
        entity = %request.entity,
        rows = rows.len(),
        records = records.len(),
        "query complete"
    );
    Ok(records)
}
