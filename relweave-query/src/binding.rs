//! A registry cursor positioned at one relation path.

use crate::alias::{AliasRegistry, NodeId};
use crate::error::QueryResult;

/// Pairs an [`AliasRegistry`] with a current path so relation and filter
/// code can resolve column expressions without knowing where it sits in the
/// global tree.
#[derive(Debug, Clone)]
pub struct LocalBinding<'a> {
    registry: &'a AliasRegistry,
    path: String,
}

impl<'a> LocalBinding<'a> {
    /// Bind to an absolute path.
    pub fn new(registry: &'a AliasRegistry, path: impl Into<String>) -> Self {
        Self {
            registry,
            path: path.into(),
        }
    }

    /// Bind to the registry root.
    pub fn root(registry: &'a AliasRegistry) -> Self {
        Self::new(registry, registry.root_path())
    }

    /// Binding for a child relation of the current path.
    pub fn child(&self, relation: &str) -> Self {
        Self::new(self.registry, format!("{}/{}", self.path, relation))
    }

    /// Current absolute path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The underlying registry.
    pub fn registry(&self) -> &'a AliasRegistry {
        self.registry
    }

    /// Alias of the table occurrence at the current path.
    pub fn alias(&self) -> QueryResult<&'a str> {
        self.registry.aliased_table_name(&self.path)
    }

    /// Resolve `expr` to `alias.column`.
    pub fn qualified(&self, expr: &str) -> QueryResult<String> {
        self.registry.qualified_column_name(expr, &self.path)
    }

    /// Resolve `expr` to the row read name `aliascolumn`.
    pub fn selected(&self, expr: &str) -> QueryResult<String> {
        self.registry.selected_column_name(expr, &self.path)
    }

    /// Node that `expr` resolves to.
    pub fn resolve_node(&self, expr: &str) -> QueryResult<NodeId> {
        self.registry.resolve(expr, &self.path).map(|(id, _)| id)
    }
}
