//! Folding joined rows back into nested records.
//!
//! The rows of a planned query arrive ordered so that every entity's rows
//! are contiguous beneath its parent. One [`Cursor`] per plan node keeps the
//! id it last saw and the record it is building; a record is complete once
//! its id changes or its parent's does, and is only then linked into the
//! parent. Records are therefore owned by exactly one parent and no shared
//! graph is ever built.
//!
//! Within a single parent, a child id that reappears after another id (the
//! cartesian product of two sibling collections) is skipped rather than
//! linked twice. Across parents the same id is hydrated again, so two posts
//! by one author each receive their own copy of the author.

use std::collections::HashSet;

use crate::config::QueryConfig;
use crate::error::{QueryError, QueryResult};
use crate::metadata::ScalarCodec;
use crate::planner::{PlanNode, QueryPlan};
use crate::record::Record;
use crate::relations::{RelationSpec, ToOneConflict};
use crate::row::RowRef;
use crate::value::{IdKey, Value};

struct Cursor<'p> {
    plan: &'p PlanNode,
    id_codec: Option<ScalarCodec>,
    last_seen: Option<IdKey>,
    current: Option<Record>,
    skipping: bool,
    linked: HashSet<IdKey>,
    children: Vec<Cursor<'p>>,
}

impl<'p> Cursor<'p> {
    fn new(plan: &'p PlanNode) -> Self {
        let id_codec = plan
            .columns()
            .iter()
            .find(|column| column.selected() == plan.id_column())
            .map(|column| column.codec());
        Self {
            plan,
            id_codec,
            last_seen: None,
            current: None,
            skipping: false,
            linked: HashSet::new(),
            children: plan.children().iter().map(Cursor::new).collect(),
        }
    }

    fn is_root(&self) -> bool {
        self.plan.relation().is_none()
    }

    fn spec(&self) -> QueryResult<&'p RelationSpec> {
        self.plan
            .relation()
            .ok_or_else(|| QueryError::internal("child cursor without a relation"))
    }

    fn read_id<R: RowRef>(&self, row: &R) -> QueryResult<Value> {
        let column = self.plan.id_column();
        let raw = row.value(column)?;
        Ok(match self.id_codec {
            Some(codec) => codec.decode(column, raw)?,
            None => raw,
        })
    }

    /// Feed one row; returns the record completed by an id change, if any.
    fn consume<R: RowRef>(&mut self, row: &R, policy: ToOneConflict) -> QueryResult<Option<Record>> {
        let id = self.read_id(row)?;
        let Some(key) = id.id_key() else {
            return Ok(None);
        };

        if self.last_seen.as_ref() == Some(&key) {
            if !self.skipping {
                self.feed_children(row, policy)?;
            }
            return Ok(None);
        }

        let finished = self.finish(policy)?;
        self.last_seen = Some(key.clone());

        if !self.is_root() && !self.linked.insert(key) {
            self.skipping = true;
            return Ok(finished);
        }
        self.skipping = false;

        let mut record = Record::new(self.plan.entity().name(), id);
        for column in self.plan.columns() {
            let value = column
                .codec()
                .decode(column.selected(), row.value(column.selected())?)?;
            record.set(column.field(), value);
        }
        for child in &self.children {
            child.spec()?.init(&mut record);
        }
        self.current = Some(record);
        self.feed_children(row, policy)?;

        Ok(finished)
    }

    fn feed_children<R: RowRef>(&mut self, row: &R, policy: ToOneConflict) -> QueryResult<()> {
        let Some(parent) = self.current.as_mut() else {
            return Ok(());
        };
        for child in &mut self.children {
            if let Some(done) = child.consume(row, policy)? {
                child.spec()?.link(parent, done, policy)?;
            }
        }
        Ok(())
    }

    /// Complete the record in progress and reset every child for the next one.
    fn finish(&mut self, policy: ToOneConflict) -> QueryResult<Option<Record>> {
        let mut record = self.current.take();
        for child in &mut self.children {
            let done = child.finish(policy)?;
            if let (Some(parent), Some(done)) = (record.as_mut(), done) {
                child.spec()?.link(parent, done, policy)?;
            }
            child.reset();
        }

        if let Some(record) = &record {
            for child in &self.children {
                let spec = child.spec()?;
                if child.plan.is_required() && !spec.is_many() && record.one(spec.name()).is_none() {
                    return Err(QueryError::relation_not_found(
                        record.entity(),
                        record.id(),
                        spec.name(),
                    ));
                }
            }
        }
        Ok(record)
    }

    fn reset(&mut self) {
        self.last_seen = None;
        self.current = None;
        self.skipping = false;
        self.linked.clear();
        for child in &mut self.children {
            child.reset();
        }
    }
}

/// Turns the rows of a [`QueryPlan`] into root [`Record`]s.
#[derive(Debug, Clone, Copy)]
pub struct Hydrator<'p> {
    root: &'p PlanNode,
    policy: ToOneConflict,
}

impl<'p> Hydrator<'p> {
    /// Create a hydrator for `plan`.
    pub fn new(plan: &'p QueryPlan, config: &QueryConfig) -> Self {
        Self {
            root: plan.root(),
            policy: config.to_one_conflict,
        }
    }

    /// Lazily hydrate `rows`, yielding each root record once its rows end.
    pub fn stream<I>(&self, rows: I) -> HydrateIter<'p, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: RowRef,
    {
        HydrateIter {
            root: Cursor::new(self.root),
            rows: rows.into_iter(),
            policy: self.policy,
            done: false,
            rows_seen: 0,
            records: 0,
        }
    }

    /// Hydrate every row into a vector of root records.
    pub fn hydrate<I>(&self, rows: I) -> QueryResult<Vec<Record>>
    where
        I: IntoIterator,
        I::Item: RowRef,
    {
        self.stream(rows).collect()
    }
}

/// Iterator returned by [`Hydrator::stream`]. Stops after the first error.
pub struct HydrateIter<'p, I> {
    root: Cursor<'p>,
    rows: I,
    policy: ToOneConflict,
    done: bool,
    rows_seen: usize,
    records: usize,
}

impl<I> HydrateIter<'_, I> {
    fn emit(&mut self, result: QueryResult<Option<Record>>) -> Option<QueryResult<Record>> {
        match result {
            Ok(Some(record)) => {
                self.records += 1;
                Some(Ok(record))
            }
            Ok(None) => None,
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<I> Iterator for HydrateIter<'_, I>
where
    I: Iterator,
    I::Item: RowRef,
{
    type Item = QueryResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while let Some(row) = self.rows.next() {
            crate::relweave_trace!(row = self.rows_seen, "hydrating row");
            self.rows_seen += 1;
            let consumed = self.root.consume(&row, self.policy);
            if let Some(item) = self.emit(consumed) {
                return Some(item);
            }
        }

        self.done = true;
        let last = self.root.finish(self.policy);
        let item = self.emit(last);
        tracing::debug!(
            rows = self.rows_seen,
            records = self.records,
            "hydration finished"
        );
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::metadata::{EntityCatalog, EntityDescriptor};
    use crate::planner::JoinPlanner;
    use crate::relations::{JoinTableSpec, QueryRequest, RelationRequest};
    use crate::row::Row;
    use pretty_assertions::assert_eq;

    fn catalog() -> EntityCatalog {
        EntityCatalog::builder()
            .entity(
                EntityDescriptor::new("User", "users")
                    .column("id", ScalarCodec::Int)
                    .column("name", ScalarCodec::Text)
                    .relation(RelationSpec::has_many("posts", "Post", "author"))
                    .relation(RelationSpec::has_one("profile", "Profile", "user_id"))
                    .relation(RelationSpec::belongs_to_many(
                        "roles",
                        "Role",
                        JoinTableSpec::new("user_roles", "user_id", "role_id"),
                    )),
            )
            .entity(
                EntityDescriptor::new("Post", "posts")
                    .column("id", ScalarCodec::Int)
                    .column("author", ScalarCodec::Int)
                    .column("title", ScalarCodec::Text)
                    .relation(RelationSpec::belongs_to("writer", "User", "author").required()),
            )
            .entity(
                EntityDescriptor::new("Profile", "profiles")
                    .column("id", ScalarCodec::Int)
                    .column("user_id", ScalarCodec::Int),
            )
            .entity(
                EntityDescriptor::new("Role", "roles")
                    .column("id", ScalarCodec::Int)
                    .column("label", ScalarCodec::Text),
            )
            .build()
            .unwrap()
    }

    fn hydrate(request: QueryRequest, config: QueryConfig, rows: Vec<Row>) -> QueryResult<Vec<Record>> {
        let catalog = catalog();
        let plan = JoinPlanner::new(&catalog, &config).plan(&request)?;
        Hydrator::new(&plan, &config).hydrate(rows)
    }

    fn user_post(user: i64, name: &str, post: Option<(i64, &str)>) -> Row {
        let row = Row::new().with("usersid", user).with("usersname", name);
        match post {
            Some((id, title)) => row
                .with("t1_id", id)
                .with("t1_author", user)
                .with("t1_title", title),
            None => row
                .with("t1_id", Value::Null)
                .with("t1_author", Value::Null)
                .with("t1_title", Value::Null),
        }
    }

    fn titles(record: &Record) -> Vec<String> {
        record
            .many("posts")
            .iter()
            .map(|p| p.get_as::<String>("title").unwrap())
            .collect()
    }

    #[test]
    fn test_groups_children_under_parents() {
        let rows = vec![
            user_post(1, "A", Some((1, "A1"))),
            user_post(1, "A", Some((2, "A2"))),
            user_post(2, "B", Some((3, "B1"))),
            user_post(3, "C", None),
        ];
        let users = hydrate(QueryRequest::new("User").with("posts"), QueryConfig::default(), rows).unwrap();

        assert_eq!(users.len(), 3);
        assert_eq!(users[0].get_as::<String>("name").unwrap(), "A");
        assert_eq!(titles(&users[0]), vec!["A1", "A2"]);
        assert_eq!(titles(&users[1]), vec!["B1"]);
        assert!(users[2].many("posts").is_empty());
        assert_eq!(users[1].many("posts")[0].id(), &Value::Int(3));
    }

    #[test]
    fn test_repeated_rows_hydrate_once() {
        let rows = vec![
            user_post(1, "A", Some((1, "A1"))),
            user_post(1, "A", Some((1, "A1"))),
            user_post(1, "A", Some((1, "A1"))),
        ];
        let users = hydrate(QueryRequest::new("User").with("posts"), QueryConfig::default(), rows).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(titles(&users[0]), vec!["A1"]);
    }

    #[test]
    fn test_sibling_collections_are_not_multiplied() {
        let row = |post: i64, role: i64| {
            user_post(1, "A", Some((post, if post == 1 { "A1" } else { "A2" })))
                .with("t3_id", role)
                .with("t3_label", format!("r{}", role))
        };
        let rows = vec![row(1, 10), row(1, 11), row(2, 10), row(2, 11)];
        let request = QueryRequest::new("User").with("posts").with("roles");
        let users = hydrate(request, QueryConfig::default(), rows).unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(titles(&users[0]), vec!["A1", "A2"]);
        let labels: Vec<String> = users[0]
            .many("roles")
            .iter()
            .map(|r| r.get_as::<String>("label").unwrap())
            .collect();
        assert_eq!(labels, vec!["r10", "r11"]);
    }

    fn post_writer(post: i64, writer: Option<i64>) -> Row {
        let row = Row::new()
            .with("postsid", post)
            .with("postsauthor", writer.map(Value::from).unwrap_or(Value::Null))
            .with("poststitle", format!("p{}", post));
        match writer {
            Some(id) => row.with("t1_id", id).with("t1_name", format!("u{}", id)),
            None => row.with("t1_id", Value::Null).with("t1_name", Value::Null),
        }
    }

    #[test]
    fn test_shared_parent_is_hydrated_per_child() {
        let rows = vec![post_writer(1, Some(9)), post_writer(2, Some(9))];
        let posts = hydrate(QueryRequest::new("Post").with("writer"), QueryConfig::default(), rows).unwrap();

        assert_eq!(posts.len(), 2);
        for post in &posts {
            let writer = post.one("writer").unwrap();
            assert_eq!(writer.id(), &Value::Int(9));
            assert_eq!(writer.get_as::<String>("name").unwrap(), "u9");
        }
    }

    #[test]
    fn test_missing_required_relation() {
        let rows = vec![post_writer(1, Some(9)), post_writer(2, None)];
        let err = hydrate(QueryRequest::new("Post").with("writer"), QueryConfig::default(), rows.clone())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RelationNotFound);
        assert!(err.message.contains("Post with id 2"));

        let request = QueryRequest::new("Post").with(RelationRequest::new("writer").optional());
        let posts = hydrate(request, QueryConfig::default(), rows).unwrap();
        assert!(posts[1].one("writer").is_none());
    }

    fn user_profile(profile: i64) -> Row {
        Row::new()
            .with("usersid", 1i64)
            .with("usersname", "A")
            .with("t1_id", profile)
            .with("t1_user_id", 1i64)
    }

    #[test]
    fn test_single_valued_conflict() {
        let rows = vec![user_profile(1), user_profile(2)];
        let err = hydrate(QueryRequest::new("User").with("profile"), QueryConfig::default(), rows.clone())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotUnique);

        let config = QueryConfig::default().to_one_conflict(ToOneConflict::LastWriteWins);
        let users = hydrate(QueryRequest::new("User").with("profile"), config, rows).unwrap();
        assert_eq!(users[0].one("profile").unwrap().id(), &Value::Int(2));
    }

    #[test]
    fn test_stream_stops_after_error() {
        let catalog = catalog();
        let config = QueryConfig::default();
        let plan = JoinPlanner::new(&catalog, &config)
            .plan(&QueryRequest::new("User").with("posts"))
            .unwrap();
        let rows = vec![
            user_post(1, "A", Some((1, "A1"))),
            user_post(2, "B", None).with("t1_id", "nope"),
            user_post(3, "C", None),
        ];

        let mut stream = Hydrator::new(&plan, &config).stream(&rows);
        let first = stream.next().unwrap();
        assert_eq!(first.unwrap_err().code, ErrorCode::InvalidDataType);
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_missing_column() {
        let rows = vec![Row::new().with("usersid", 1i64)];
        let err = hydrate(QueryRequest::new("User"), QueryConfig::default(), rows).unwrap_err();
        assert_eq!(err.code, ErrorCode::DeserializationError);
    }

    #[test]
    fn test_no_rows() {
        let users = hydrate(QueryRequest::new("User").with("posts"), QueryConfig::default(), Vec::new()).unwrap();
        assert!(users.is_empty());
    }
}
