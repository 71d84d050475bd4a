//! Join planning.
//!
//! A [`QueryRequest`] is planned in two passes. The first walks the request
//! tree and registers every table occurrence with the [`AliasRegistry`],
//! producing the [`PlanNode`] tree the hydrator later walks. The second
//! renders SQL against the now complete registry, so a filter anywhere in
//! the tree can name any loaded relation by path.
//!
//! The resulting statement has the shape
//!
//! ```text
//! SELECT <alias.col AS aliascol, ...> FROM <root>
//!   [LEFT JOIN <target> AS <alias> ON <keys> [AND <filter>] [AND <alias>.<soft> IS NULL]]*
//!   [WHERE <root soft delete> [AND <root filter>]]
//!   [ORDER BY <root fields>, <every loaded id>]
//!   [LIMIT n] [OFFSET m]
//! ```
//!
//! A filter attached to a relation lives in its ON clause and only narrows
//! which related rows attach. A root filter on a relation path
//! (`posts/title`) lives in WHERE and drops root rows with no match.

use smol_str::SmolStr;
use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::alias::{AliasRegistry, NodeId};
use crate::binding::LocalBinding;
use crate::config::{NestedModifiers, QueryConfig};
use crate::error::{QueryError, QueryResult};
use crate::filter::Filter;
use crate::metadata::{EntityCatalog, EntityDescriptor, ScalarCodec};
use crate::relations::{QueryRequest, RelationRequest, RelationSpec};
use crate::sql::{SqlBuilder, qualify, quote_identifier};
use crate::value::Value;

/// A column as the hydrator reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedColumn {
    field: SmolStr,
    selected: String,
    codec: ScalarCodec,
}

impl PlannedColumn {
    /// Field name on the hydrated record.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Name of the column in the result row.
    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// Codec applied when reading the column.
    pub fn codec(&self) -> ScalarCodec {
        self.codec
    }
}

/// One table occurrence of a planned query.
#[derive(Debug, Clone)]
pub struct PlanNode {
    node: NodeId,
    path: String,
    alias: SmolStr,
    pivot_alias: Option<SmolStr>,
    entity: Arc<EntityDescriptor>,
    relation: Option<RelationSpec>,
    required: bool,
    id_selected: String,
    columns: Vec<PlannedColumn>,
    children: Vec<PlanNode>,
}

impl PlanNode {
    fn new(
        registry: &AliasRegistry,
        node: NodeId,
        path: String,
        entity: Arc<EntityDescriptor>,
        relation: Option<RelationSpec>,
        required: bool,
        pivot_alias: Option<SmolStr>,
    ) -> QueryResult<Self> {
        let id_selected = registry.selected_column_name(entity.id_column(), &path)?;
        let columns = entity
            .columns()
            .map(|column| {
                Ok(PlannedColumn {
                    field: SmolStr::new(column.name()),
                    selected: registry.selected_column_name(column.name(), &path)?,
                    codec: column.codec(),
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(Self {
            node,
            alias: SmolStr::new(registry.node(node).alias()),
            path,
            pivot_alias,
            entity,
            relation,
            required,
            id_selected,
            columns,
            children: Vec::new(),
        })
    }

    /// Registry node id; also the position of this table in join order.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Absolute relation path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// SQL alias.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Alias of the pivot table for many-to-many relations.
    pub fn pivot_alias(&self) -> Option<&str> {
        self.pivot_alias.as_deref()
    }

    /// Entity loaded at this node.
    pub fn entity(&self) -> &EntityDescriptor {
        &self.entity
    }

    /// Relation from the parent, `None` at the root.
    pub fn relation(&self) -> Option<&RelationSpec> {
        self.relation.as_ref()
    }

    /// Whether every parent must end up with a match.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Result-row name of the id column.
    pub fn id_column(&self) -> &str {
        &self.id_selected
    }

    /// Columns to read, in entity declaration order.
    pub fn columns(&self) -> &[PlannedColumn] {
        &self.columns
    }

    /// Child nodes in request order.
    pub fn children(&self) -> &[PlanNode] {
        &self.children
    }

    /// This node and all descendants, pre-order.
    pub fn preorder(&self) -> Vec<&PlanNode> {
        let mut out = Vec::new();
        self.collect_preorder(&mut out);
        out
    }

    fn collect_preorder<'a>(&'a self, out: &mut Vec<&'a PlanNode>) {
        out.push(self);
        for child in &self.children {
            child.collect_preorder(out);
        }
    }
}

/// A planned query: SQL, parameters and the tree to hydrate with.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    sql: String,
    params: Vec<Value>,
    registry: AliasRegistry,
    root: PlanNode,
}

impl QueryPlan {
    /// The SELECT statement.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound parameters in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// The alias registry built while planning.
    pub fn registry(&self) -> &AliasRegistry {
        &self.registry
    }

    /// Root of the plan tree.
    pub fn root(&self) -> &PlanNode {
        &self.root
    }
}

/// Plans request trees against an entity catalog.
#[derive(Debug, Clone, Copy)]
pub struct JoinPlanner<'a> {
    catalog: &'a EntityCatalog,
    config: &'a QueryConfig,
}

impl<'a> JoinPlanner<'a> {
    /// Create a planner.
    pub fn new(catalog: &'a EntityCatalog, config: &'a QueryConfig) -> Self {
        Self { catalog, config }
    }

    /// Plan `request` into one SELECT.
    pub fn plan(&self, request: &QueryRequest) -> QueryResult<QueryPlan> {
        let entity = self.descriptor(&request.entity)?;
        let mut registry = AliasRegistry::new(entity.table(), entity.column_names());
        let root_path = registry.root_path().to_string();

        let mut root = PlanNode::new(&registry, 0, root_path, entity, None, false, None)?;
        root.children = self.register(&mut registry, &root.path, &root.entity, &request.with)?;

        let mut builder = SqlBuilder::new(self.config.dialect);
        self.write_joins(&registry, &root, &request.with, &mut builder)?;
        self.write_where(&registry, &root, request, &mut builder)?;
        self.write_order_by(&registry, &root, request, &mut builder)?;

        let mut pagination = String::new();
        request.pagination.write_sql(self.config.dialect, &mut pagination);
        if !pagination.is_empty() {
            builder.push(" ").push(pagination);
        }

        let (tail, params) = builder.build();
        let sql = format!(
            "SELECT {} FROM {}{}",
            registry.select_columns().join(", "),
            quote_identifier(root.entity.table()),
            tail
        );

        tracing::debug!(
            entity = %request.entity,
            tables = registry.len(),
            params = params.len(),
            "planned query"
        );
        crate::relweave_trace!(sql = %sql, "planned sql");

        Ok(QueryPlan {
            sql,
            params,
            registry,
            root,
        })
    }

    fn descriptor(&self, name: &str) -> QueryResult<Arc<EntityDescriptor>> {
        self.catalog
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::invalid_metadata(name, "entity is not registered"))
    }

    // Pass 1: give every requested relation its alias and plan node.
    fn register(
        &self,
        registry: &mut AliasRegistry,
        parent_path: &str,
        parent: &EntityDescriptor,
        requests: &IndexMap<SmolStr, RelationRequest>,
    ) -> QueryResult<Vec<PlanNode>> {
        let mut nodes = Vec::with_capacity(requests.len());
        for request in requests.values() {
            let spec = parent.require_relation(&request.relation)?.clone();
            let path = format!("{}/{}", parent_path, request.relation);
            self.check_nested_modifiers(&path, request)?;

            let target = self.descriptor(spec.target())?;
            let pivot_alias = spec.needs_pivot().then(|| registry.mint_alias());
            registry.add_relation(&path, target.column_names())?;
            let node_id = registry.len() - 1;
            let required = spec.is_required() && !request.optional;

            let mut node =
                PlanNode::new(registry, node_id, path, target, Some(spec), required, pivot_alias)?;
            node.children = self.register(registry, &node.path, &node.entity, &request.with)?;
            nodes.push(node);
        }
        Ok(nodes)
    }

    fn check_nested_modifiers(&self, path: &str, request: &RelationRequest) -> QueryResult<()> {
        let mut modifiers = Vec::new();
        if request.order_by.as_ref().is_some_and(|o| !o.is_empty()) {
            modifiers.push("order_by");
        }
        if request.pagination.is_some_and(|p| !p.is_empty()) {
            modifiers.push("skip/take");
        }
        let Some(first) = modifiers.first() else {
            return Ok(());
        };

        match self.config.nested_modifiers {
            NestedModifiers::Reject => Err(QueryError::nested_modifier(path, first)),
            NestedModifiers::Ignore => {
                tracing::warn!(
                    relation = path,
                    modifiers = ?modifiers,
                    "ignoring ordering/pagination on nested relation"
                );
                Ok(())
            }
        }
    }

    // Pass 2: joins in pre-order, each followed by its own ON-clause extras.
    fn write_joins(
        &self,
        registry: &AliasRegistry,
        parent: &PlanNode,
        requests: &IndexMap<SmolStr, RelationRequest>,
        builder: &mut SqlBuilder,
    ) -> QueryResult<()> {
        for (node, request) in parent.children.iter().zip(requests.values()) {
            let Some(spec) = node.relation.as_ref() else {
                return Err(QueryError::internal("child plan node without a relation"));
            };
            spec.write_join(
                builder,
                node.entity.table(),
                &parent.alias,
                &node.alias,
                node.pivot_alias.as_deref(),
            )?;

            if let Some(filter) = request.filter.as_ref().filter(|f| !f.is_none()) {
                let binding = LocalBinding::new(registry, node.path.clone());
                check_join_order(&binding, node, filter)?;
                builder.push(" AND ");
                filter.write_sql(&binding, builder)?;
            }
            if let Some(column) = node.entity.soft_delete_column() {
                if !request.include_soft_deleted {
                    builder
                        .push(" AND ")
                        .push(qualify(&node.alias, column))
                        .push(" IS NULL");
                }
            }

            self.write_joins(registry, node, &request.with, builder)?;
        }
        Ok(())
    }

    fn write_where(
        &self,
        registry: &AliasRegistry,
        root: &PlanNode,
        request: &QueryRequest,
        builder: &mut SqlBuilder,
    ) -> QueryResult<()> {
        let mut keyword = " WHERE ";
        if let Some(column) = root.entity.soft_delete_column() {
            if !request.include_soft_deleted {
                builder
                    .push(keyword)
                    .push(qualify(&root.alias, column))
                    .push(" IS NULL");
                keyword = " AND ";
            }
        }
        if let Some(filter) = request.filter.as_ref().filter(|f| !f.is_none()) {
            builder.push(keyword);
            filter.write_sql(&LocalBinding::root(registry), builder)?;
        }
        Ok(())
    }

    fn write_order_by(
        &self,
        registry: &AliasRegistry,
        root: &PlanNode,
        request: &QueryRequest,
        builder: &mut SqlBuilder,
    ) -> QueryResult<()> {
        let binding = LocalBinding::root(registry);
        let mut terms = Vec::new();
        let mut seen = HashSet::new();

        for field in request.order_by.fields() {
            terms.push(field.to_sql(&binding)?);
            seen.insert(binding.qualified(&field.column)?);
        }
        if self.config.stable_ordering {
            for node in root.preorder() {
                let column = qualify(&node.alias, node.entity.id_column());
                if seen.insert(column.clone()) {
                    terms.push(format!("{} ASC", column));
                }
            }
        }

        if !terms.is_empty() {
            builder.push(" ORDER BY ").push(terms.join(", "));
        }
        Ok(())
    }
}

// An ON clause can only see tables joined before it, i.e. nodes registered
// no later than the one being joined.
fn check_join_order(binding: &LocalBinding<'_>, node: &PlanNode, filter: &Filter) -> QueryResult<()> {
    for path in filter.column_paths() {
        if binding.resolve_node(path)? > node.node {
            return Err(QueryError::invalid_filter(format!(
                "`{}` in the filter on `{}` refers to a relation joined after it",
                path, node.path
            ))
            .with_suggestion("Request that relation earlier, or filter on it from the root query"));
        }
    }
    Ok(())
}
