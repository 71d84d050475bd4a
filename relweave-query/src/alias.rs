//! Alias registry and relation-path resolution.
//!
//! Every table occurrence in a planned query gets one [`AliasNode`]. Nodes
//! form a strict tree stored in an arena: the root sits at index 0 and uses
//! the real table name as its alias, every other node gets a synthetic alias
//! minted from a single counter (`t1_`, `t2_`, ...).
//!
//! Paths are `/`-separated relation names starting with the root alias:
//!
//! ```rust
//! use relweave_query::alias::AliasRegistry;
//!
//! let mut registry = AliasRegistry::new("users", ["id", "name"]);
//! registry.add_relation("users/posts", ["id", "title"]).unwrap();
//!
//! assert_eq!(registry.qualified_column_name("title", "users/posts").unwrap(), "t1_.title");
//! assert_eq!(registry.selected_column_name("../name", "users/posts").unwrap(), "usersname");
//! ```
//!
//! Two naming schemes coexist. `qualified_column_name` gives `alias.column`
//! for predicates and joins; `selected_column_name` gives `aliascolumn`, the
//! name the column is read back under from a result row. Synthetic aliases
//! end in `_`, which keeps the concatenated names of different nodes from
//! colliding.

use indexmap::{IndexMap, IndexSet};
use smol_str::{SmolStr, format_smolstr};
use std::collections::HashSet;

use crate::error::{QueryError, QueryResult};
use crate::sql::{qualify, quote_identifier};

/// Index of a node inside an [`AliasRegistry`].
pub type NodeId = usize;

const ALIAS_PREFIX: &str = "t";
const PARENT_SEGMENT: &str = "..";

/// One table occurrence in the plan.
#[derive(Debug, Clone)]
pub struct AliasNode {
    name: SmolStr,
    alias: SmolStr,
    columns: IndexSet<SmolStr>,
    children: IndexMap<SmolStr, NodeId>,
    parent: Option<NodeId>,
}

impl AliasNode {
    /// Relation name this node was registered under (the table name for the root).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The alias used in SQL.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Columns selected for this occurrence, in registration order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(SmolStr::as_str)
    }

    /// Whether `column` belongs to this occurrence.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Child node registered under `relation`.
    pub fn child(&self, relation: &str) -> Option<NodeId> {
        self.children.get(relation).copied()
    }

    /// Parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Tree of aliased table occurrences for a single query.
#[derive(Debug, Clone)]
pub struct AliasRegistry {
    nodes: Vec<AliasNode>,
    used: HashSet<SmolStr>,
    counter: usize,
}

impl AliasRegistry {
    /// Create a registry whose root node is aliased by its table name.
    pub fn new(
        root_table: impl Into<SmolStr>,
        root_columns: impl IntoIterator<Item = impl Into<SmolStr>>,
    ) -> Self {
        let root_table = root_table.into();
        let root = AliasNode {
            name: root_table.clone(),
            alias: root_table.clone(),
            columns: root_columns.into_iter().map(Into::into).collect(),
            children: IndexMap::new(),
            parent: None,
        };
        let mut used = HashSet::new();
        used.insert(root_table);

        Self {
            nodes: vec![root],
            used,
            counter: 0,
        }
    }

    /// The root node.
    pub fn root(&self) -> &AliasNode {
        &self.nodes[0]
    }

    /// Identifier that starts every path (the root table name).
    pub fn root_path(&self) -> &str {
        &self.nodes[0].alias
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> &AliasNode {
        &self.nodes[id]
    }

    /// Number of table occurrences registered, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a registry holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &AliasNode> {
        self.nodes.iter()
    }

    /// Mint a fresh alias that is not tied to a node (pivot tables).
    pub fn mint_alias(&mut self) -> SmolStr {
        loop {
            self.counter += 1;
            let candidate = format_smolstr!("{}{}_", ALIAS_PREFIX, self.counter);
            if self.used.contains(&candidate) || self.shadows_root_column(&candidate) {
                continue;
            }
            self.used.insert(candidate.clone());
            return candidate;
        }
    }

    // A synthetic alias must not be a prefix of any `<root><column>` read name.
    fn shadows_root_column(&self, candidate: &str) -> bool {
        let root = &self.nodes[0];
        root.columns.iter().any(|column| {
            let selected = format!("{}{}", root.alias, column);
            selected.starts_with(candidate)
        })
    }

    /// Register a child node at `path` and return its fresh alias.
    ///
    /// Every segment of `path` except the last must already be registered.
    pub fn add_relation(
        &mut self,
        path: &str,
        columns: impl IntoIterator<Item = impl Into<SmolStr>>,
    ) -> QueryResult<&str> {
        let segments = split_path(path)?;
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(QueryError::unresolved_segment(path, ""));
        };
        if parents.is_empty() {
            return Err(QueryError::unresolved_segment(path, *leaf)
                .with_help("Relation paths start with the root table name"));
        }

        let parent = self.walk(path, parents)?;
        if self.nodes[parent].children.contains_key(*leaf) {
            return Err(QueryError::internal(format!(
                "relation path `{}` is already registered",
                path
            )));
        }

        let alias = self.mint_alias();
        let id = self.nodes.len();
        self.nodes.push(AliasNode {
            name: SmolStr::new(*leaf),
            alias,
            columns: columns.into_iter().map(Into::into).collect(),
            children: IndexMap::new(),
            parent: Some(parent),
        });
        self.nodes[parent].children.insert(SmolStr::new(*leaf), id);

        tracing::trace!(path, alias = %self.nodes[id].alias, "registered relation alias");
        Ok(self.nodes[id].alias.as_str())
    }

    /// Complete SELECT list: one `alias.column AS aliascolumn` entry per column, pre-order.
    pub fn select_columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_select(0, &mut out);
        out
    }

    fn collect_select(&self, id: NodeId, out: &mut Vec<String>) {
        let node = &self.nodes[id];
        for column in &node.columns {
            out.push(format!(
                "{} AS {}",
                qualify(&node.alias, column),
                quote_identifier(&format!("{}{}", node.alias, column))
            ));
        }
        for child in node.children.values() {
            self.collect_select(*child, out);
        }
    }

    /// Node id for an absolute path.
    pub fn node_at(&self, path: &str) -> QueryResult<NodeId> {
        let segments = split_path(path)?;
        self.walk(path, &segments)
    }

    /// Alias of the node at `local_root`.
    pub fn aliased_table_name(&self, local_root: &str) -> QueryResult<&str> {
        let id = self.node_at(local_root)?;
        Ok(self.nodes[id].alias.as_str())
    }

    /// Resolve `expr` relative to `local_root` into `alias.column`.
    pub fn qualified_column_name(&self, expr: &str, local_root: &str) -> QueryResult<String> {
        let (id, column) = self.resolve(expr, local_root)?;
        Ok(qualify(&self.nodes[id].alias, column))
    }

    /// Resolve `expr` relative to `local_root` into the row read name `aliascolumn`.
    pub fn selected_column_name(&self, expr: &str, local_root: &str) -> QueryResult<String> {
        let (id, column) = self.resolve(expr, local_root)?;
        Ok(format!("{}{}", self.nodes[id].alias, column))
    }

    /// Resolve a relative column expression to its node and column name.
    ///
    /// Each relation segment of `expr` either pops (`..`) or pushes onto the
    /// segments of `local_root`; the trailing segment names the column.
    pub fn resolve<'e>(&self, expr: &'e str, local_root: &str) -> QueryResult<(NodeId, &'e str)> {
        let relative = split_path(expr)?;
        let Some((column, relations)) = relative.split_last() else {
            return Err(QueryError::invalid_filter("empty column expression"));
        };
        if *column == PARENT_SEGMENT {
            return Err(QueryError::unknown_column(local_root, *column));
        }

        let mut stack: Vec<&str> = split_path(local_root)?;
        for segment in relations {
            if *segment == PARENT_SEGMENT {
                stack.pop();
                if stack.is_empty() {
                    return Err(QueryError::path_above_root(format!("{}/{}", local_root, expr)));
                }
            } else {
                stack.push(*segment);
            }
        }

        let full = stack.join("/");
        let id = self.walk(&full, &stack)?;
        if !self.nodes[id].columns.contains(*column) {
            return Err(QueryError::unknown_column(full, *column)
                .with_suggestion(format!(
                    "Known columns: {}",
                    self.nodes[id].columns.iter().map(SmolStr::as_str).collect::<Vec<_>>().join(", ")
                )));
        }
        Ok((id, *column))
    }

    fn walk(&self, path: &str, segments: &[&str]) -> QueryResult<NodeId> {
        let Some((first, rest)) = segments.split_first() else {
            return Err(QueryError::unresolved_segment(path, ""));
        };
        if *first != self.nodes[0].alias {
            return Err(QueryError::unresolved_segment(path, *first));
        }
        let mut current = 0;
        for segment in rest {
            current = self.nodes[current]
                .children
                .get(*segment)
                .copied()
                .ok_or_else(|| QueryError::unresolved_segment(path, *segment))?;
        }
        Ok(current)
    }
}

fn split_path(path: &str) -> QueryResult<Vec<&str>> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(QueryError::unresolved_segment(path, ""));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    fn tree() -> AliasRegistry {
        let mut registry = AliasRegistry::new("foo", ["foo_id", "foo_a"]);
        registry.add_relation("foo/bar", ["bar_id", "bar_a"]).unwrap();
        registry.add_relation("foo/bar/baz", ["baz_id", "baz_a"]).unwrap();
        registry.add_relation("foo/bam", ["bam_id", "bam_a"]).unwrap();
        registry
    }

    #[test]
    fn test_root_uses_table_name() {
        let registry = AliasRegistry::new("users", ["id"]);
        assert_eq!(registry.aliased_table_name("users").unwrap(), "users");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_aliases_are_unique() {
        let registry = tree();
        let aliases: HashSet<&str> = registry.nodes().map(AliasNode::alias).collect();
        assert_eq!(aliases.len(), registry.len());
        assert_eq!(registry.aliased_table_name("foo/bar").unwrap(), "t1_");
        assert_eq!(registry.aliased_table_name("foo/bar/baz").unwrap(), "t2_");
        assert_eq!(registry.aliased_table_name("foo/bam").unwrap(), "t3_");
    }

    #[test]
    fn test_parent_navigation() {
        let registry = tree();
        assert_eq!(
            registry.qualified_column_name("../foo_a", "foo/bar").unwrap(),
            registry.qualified_column_name("foo_a", "foo").unwrap()
        );
        assert_eq!(
            registry.qualified_column_name("../../bam/bam_a", "foo/bar/baz").unwrap(),
            registry.qualified_column_name("bam_a", "foo/bam").unwrap()
        );
        assert_eq!(
            registry.selected_column_name("../../bam/bam_a", "foo/bar/baz").unwrap(),
            "t3_bam_a"
        );
    }

    #[test]
    fn test_child_navigation() {
        let registry = tree();
        assert_eq!(registry.qualified_column_name("bar/baz/baz_a", "foo").unwrap(), "t2_.baz_a");
        assert_eq!(registry.qualified_column_name("../bam/bam_id", "foo/bar").unwrap(), "t3_.bam_id");
    }

    #[test]
    fn test_qualified_and_selected_agree() {
        let registry = tree();
        for (path, column) in [("foo", "foo_a"), ("foo/bar", "bar_id"), ("foo/bar/baz", "baz_a")] {
            let alias = registry.aliased_table_name(path).unwrap();
            assert_eq!(
                registry.qualified_column_name(column, path).unwrap(),
                format!("{}.{}", alias, column)
            );
            assert_eq!(
                registry.selected_column_name(column, path).unwrap(),
                format!("{}{}", alias, column)
            );
        }
    }

    #[test]
    fn test_select_columns_preorder() {
        let registry = tree();
        let select = registry.select_columns();
        assert_eq!(select.len(), 8);
        assert_eq!(select[0], "foo.foo_id AS foofoo_id");
        assert_eq!(select[2], "t1_.bar_id AS t1_bar_id");
        assert_eq!(select[4], "t2_.baz_id AS t2_baz_id");
        assert_eq!(select[7], "t3_.bam_a AS t3_bam_a");
    }

    #[test]
    fn test_unregistered_segment_fails() {
        let registry = tree();
        let err = registry.qualified_column_name("nope/x", "foo").unwrap_err();
        assert_eq!(err.code, ErrorCode::PathResolution);
        assert!(err.message.contains("`nope`"));

        let mut registry = tree();
        let err = registry.add_relation("foo/missing/leaf", ["id"]).unwrap_err();
        assert_eq!(err.code, ErrorCode::PathResolution);
        assert!(err.message.contains("`missing`"));
    }

    #[test]
    fn test_unknown_column_fails() {
        let registry = tree();
        let err = registry.selected_column_name("nope", "foo/bar").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownColumn);
    }

    #[test]
    fn test_navigation_above_root_fails() {
        let registry = tree();
        let err = registry.qualified_column_name("../foo_a", "foo").unwrap_err();
        assert_eq!(err.code, ErrorCode::PathResolution);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = tree();
        assert!(registry.add_relation("foo/bar", ["x"]).is_err());
    }

    #[test]
    fn test_alias_skips_root_prefix_collision() {
        // "t" + "1_x" would read back as "t1_x", the same as "t1_" + "x".
        let mut registry = AliasRegistry::new("t", ["1_x"]);
        let alias = registry.add_relation("t/child", ["x"]).unwrap().to_string();
        assert_eq!(alias, "t2_");
    }

    #[test]
    fn test_mint_alias_for_pivot() {
        let mut registry = tree();
        let pivot = registry.mint_alias();
        assert_eq!(pivot, "t4_");
        registry.add_relation("foo/bam/next", ["id"]).unwrap();
        assert_eq!(registry.aliased_table_name("foo/bam/next").unwrap(), "t5_");
    }
}
