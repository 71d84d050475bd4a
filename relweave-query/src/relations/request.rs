//! Request trees describing what to load.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::filter::Filter;
use crate::pagination::Pagination;
use crate::types::OrderBy;

/// One requested relation, with its own filter and nested relations.
///
/// The filter is rendered into the relation's JOIN ... ON clause, so it
/// narrows which related rows attach without dropping the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationRequest {
    /// Name of the relation on the parent entity.
    pub relation: SmolStr,
    /// Predicate applied inside the join.
    pub filter: Option<Filter>,
    /// Ordering; only meaningful on the root query.
    pub order_by: Option<OrderBy>,
    /// Pagination; only meaningful on the root query.
    pub pagination: Option<Pagination>,
    /// Nested relations, in request order.
    pub with: IndexMap<SmolStr, RelationRequest>,
    /// Keep soft-deleted related rows.
    pub include_soft_deleted: bool,
    /// Accept a missing match even if the relation is declared required.
    pub optional: bool,
}

impl RelationRequest {
    /// Request the relation named `relation`.
    pub fn new(relation: impl Into<SmolStr>) -> Self {
        Self {
            relation: relation.into(),
            filter: None,
            order_by: None,
            pagination: None,
            with: IndexMap::new(),
            include_soft_deleted: false,
            optional: false,
        }
    }

    /// Add a filter; repeated calls are ANDed.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and_then(filter.into()),
            None => filter.into(),
        });
        self
    }

    /// Set ordering for the related records.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.order_by = Some(order.into());
        self
    }

    /// Skip related records.
    pub fn skip(mut self, n: u64) -> Self {
        self.pagination = Some(self.pagination.unwrap_or_default().skip(n));
        self
    }

    /// Take a limited number of related records.
    pub fn take(mut self, n: u64) -> Self {
        self.pagination = Some(self.pagination.unwrap_or_default().take(n));
        self
    }

    /// Load a nested relation.
    pub fn with(mut self, nested: impl Into<RelationRequest>) -> Self {
        let nested = nested.into();
        self.with.insert(nested.relation.clone(), nested);
        self
    }

    /// Load a nested relation, configuring it with a closure.
    pub fn with_fn(
        self,
        relation: impl Into<SmolStr>,
        configure: impl FnOnce(RelationRequest) -> RelationRequest,
    ) -> Self {
        self.with(configure(RelationRequest::new(relation)))
    }

    /// Include soft-deleted related rows.
    pub fn with_trashed(mut self) -> Self {
        self.include_soft_deleted = true;
        self
    }

    /// Treat a required relation as optional for this query.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Check if there are nested requests.
    pub fn has_nested(&self) -> bool {
        !self.with.is_empty()
    }

    /// Nested requests in order.
    pub fn nested(&self) -> impl Iterator<Item = &RelationRequest> {
        self.with.values()
    }
}

impl From<&str> for RelationRequest {
    fn from(relation: &str) -> Self {
        Self::new(relation)
    }
}

impl From<String> for RelationRequest {
    fn from(relation: String) -> Self {
        Self::new(relation)
    }
}

/// The root of a request tree.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Root entity name.
    pub entity: SmolStr,
    /// Root WHERE predicate.
    pub filter: Option<Filter>,
    /// Caller ordering, root columns only.
    pub order_by: OrderBy,
    /// LIMIT/OFFSET over joined rows.
    pub pagination: Pagination,
    /// Keep soft-deleted root rows.
    pub include_soft_deleted: bool,
    /// Requested relations, in request order.
    pub with: IndexMap<SmolStr, RelationRequest>,
}

impl QueryRequest {
    /// Request entities of type `entity`.
    pub fn new(entity: impl Into<SmolStr>) -> Self {
        Self {
            entity: entity.into(),
            filter: None,
            order_by: OrderBy::none(),
            pagination: Pagination::new(),
            include_soft_deleted: false,
            with: IndexMap::new(),
        }
    }

    /// Add a filter; repeated calls are ANDed.
    ///
    /// A path into a loaded relation (`posts/title`) filters root rows by
    /// their joined rows, which drops roots without a match.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and_then(filter.into()),
            None => filter.into(),
        });
        self
    }

    /// Set ordering.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.order_by = order.into();
        self
    }

    /// Skip joined rows.
    pub fn skip(mut self, n: u64) -> Self {
        self.pagination = self.pagination.skip(n);
        self
    }

    /// Take a limited number of joined rows.
    pub fn take(mut self, n: u64) -> Self {
        self.pagination = self.pagination.take(n);
        self
    }

    /// Load a relation.
    pub fn with(mut self, relation: impl Into<RelationRequest>) -> Self {
        let relation = relation.into();
        self.with.insert(relation.relation.clone(), relation);
        self
    }

    /// Load a relation, configuring it with a closure.
    pub fn with_fn(
        self,
        relation: impl Into<SmolStr>,
        configure: impl FnOnce(RelationRequest) -> RelationRequest,
    ) -> Self {
        self.with(configure(RelationRequest::new(relation)))
    }

    /// Include soft-deleted root rows.
    pub fn with_trashed(mut self) -> Self {
        self.include_soft_deleted = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderByField;

    #[test]
    fn test_relation_request_basic() {
        let request = RelationRequest::new("posts");
        assert_eq!(request.relation, "posts");
        assert!(request.filter.is_none());
        assert!(!request.has_nested());
    }

    #[test]
    fn test_relation_request_with_options() {
        let request = RelationRequest::new("posts")
            .order_by(OrderByField::desc("id"))
            .take(5)
            .with_trashed()
            .optional();

        assert!(request.order_by.is_some());
        assert_eq!(request.pagination, Some(Pagination::new().take(5)));
        assert!(request.include_soft_deleted);
        assert!(request.optional);
    }

    #[test]
    fn test_nested_requests_keep_order() {
        let request = RelationRequest::new("posts")
            .with("tags")
            .with_fn("comments", |c| c.r#where(Filter::is_not_null("body")));

        let names: Vec<&str> = request.nested().map(|r| r.relation.as_str()).collect();
        assert_eq!(names, vec!["tags", "comments"]);
        assert!(request.with["comments"].filter.is_some());
    }

    #[test]
    fn test_repeated_where_is_anded() {
        let request = QueryRequest::new("User")
            .r#where(Filter::is_null("a"))
            .r#where(Filter::is_null("b"));
        assert!(matches!(request.filter, Some(Filter::And(ref fs)) if fs.len() == 2));
    }

    #[test]
    fn test_query_request_pagination() {
        let request = QueryRequest::new("User").skip(10).take(5).with("posts");
        assert_eq!(request.pagination.skip, Some(10));
        assert_eq!(request.pagination.take, Some(5));
        assert!(request.with.contains_key("posts"));
    }
}
