//! Entity descriptors: the static shape of every loadable entity.
//!
//! Descriptors are built once, validated together in an [`EntityCatalog`],
//! and shared read-only by every query afterwards.
//!
//! ```rust
//! use relweave_query::metadata::{EntityCatalog, EntityDescriptor, ScalarCodec};
//! use relweave_query::relations::RelationSpec;
//!
//! let catalog = EntityCatalog::builder()
//!     .entity(
//!         EntityDescriptor::new("User", "users")
//!             .column("id", ScalarCodec::Int)
//!             .column("name", ScalarCodec::Text)
//!             .relation(RelationSpec::has_many("posts", "Post", "author")),
//!     )
//!     .entity(
//!         EntityDescriptor::new("Post", "posts")
//!             .column("id", ScalarCodec::Int)
//!             .column("author", ScalarCodec::Int)
//!             .column("title", ScalarCodec::Text),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(catalog.entity("User").unwrap().table(), "users");
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::sync::Arc;

use crate::error::{QueryError, QueryResult};
use crate::relations::{RelationKind, RelationSpec};
use crate::row::RowError;
use crate::value::Value;

const DEFAULT_ID_COLUMN: &str = "id";

/// Decoder applied to a column value as it is read from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarCodec {
    /// 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// Boolean, also accepting 0/1 and common text spellings.
    Bool,
    /// UTF-8 text.
    Text,
    /// Arbitrary JSON.
    Json,
    /// UUID normalised to its hyphenated lowercase form.
    Uuid,
}

impl ScalarCodec {
    /// Normalise a driver value into this codec's canonical [`Value`] variant.
    ///
    /// `Null` passes through every codec unchanged.
    pub fn decode(&self, column: &str, value: Value) -> Result<Value, RowError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = |value: &Value| RowError::TypeConversion {
            column: column.to_string(),
            message: format!("cannot decode {} as {:?}", value.kind(), self),
        };

        match (self, value) {
            (Self::Int, Value::Int(i)) => Ok(Value::Int(i)),
            (Self::Int, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| RowError::TypeConversion {
                    column: column.to_string(),
                    message: e.to_string(),
                }),

            (Self::Float, Value::Float(f)) => Ok(Value::Float(f)),
            (Self::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
            (Self::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| RowError::TypeConversion {
                    column: column.to_string(),
                    message: e.to_string(),
                }),

            (Self::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (Self::Bool, Value::Int(0)) => Ok(Value::Bool(false)),
            (Self::Bool, Value::Int(1)) => Ok(Value::Bool(true)),
            (Self::Bool, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(Value::Bool(true)),
                "false" | "f" | "0" => Ok(Value::Bool(false)),
                _ => Err(mismatch(&Value::String(s))),
            },

            (Self::Text, Value::String(s)) => Ok(Value::String(s)),
            (Self::Text, Value::Json(serde_json::Value::String(s))) => Ok(Value::String(s)),

            (Self::Json, Value::Json(j)) => Ok(Value::Json(j)),
            (Self::Json, Value::String(s)) => serde_json::from_str(&s)
                .map(Value::Json)
                .map_err(|e| RowError::TypeConversion {
                    column: column.to_string(),
                    message: e.to_string(),
                }),
            (Self::Json, other) => serde_json::to_value(&other)
                .map(Value::Json)
                .map_err(|e| RowError::TypeConversion {
                    column: column.to_string(),
                    message: e.to_string(),
                }),

            (Self::Uuid, Value::String(s)) => uuid::Uuid::parse_str(&s)
                .map(|u| Value::String(u.hyphenated().to_string()))
                .map_err(|e| RowError::TypeConversion {
                    column: column.to_string(),
                    message: e.to_string(),
                }),

            (_, other) => Err(mismatch(&other)),
        }
    }
}

/// A selected column and its codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    name: SmolStr,
    codec: ScalarCodec,
}

impl ColumnDescriptor {
    /// Create a column descriptor.
    pub fn new(name: impl Into<SmolStr>, codec: ScalarCodec) -> Self {
        Self {
            name: name.into(),
            codec,
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column codec.
    pub fn codec(&self) -> ScalarCodec {
        self.codec
    }
}

/// Shape of one entity type: table, columns, id, relations and soft delete.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    name: SmolStr,
    table: SmolStr,
    columns: IndexMap<SmolStr, ColumnDescriptor>,
    id_column: SmolStr,
    relations: IndexMap<SmolStr, RelationSpec>,
    soft_delete_column: Option<SmolStr>,
}

impl EntityDescriptor {
    /// Start a descriptor for entity `name` stored in `table`.
    pub fn new(name: impl Into<SmolStr>, table: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: IndexMap::new(),
            id_column: SmolStr::new_static(DEFAULT_ID_COLUMN),
            relations: IndexMap::new(),
            soft_delete_column: None,
        }
    }

    /// Declare a column.
    pub fn column(mut self, name: impl Into<SmolStr>, codec: ScalarCodec) -> Self {
        let column = ColumnDescriptor::new(name, codec);
        self.columns.insert(column.name.clone(), column);
        self
    }

    /// Set the id column (defaults to `id`).
    pub fn id(mut self, column: impl Into<SmolStr>) -> Self {
        self.id_column = column.into();
        self
    }

    /// Mark `column` as the soft-delete timestamp.
    pub fn soft_delete(mut self, column: impl Into<SmolStr>) -> Self {
        self.soft_delete_column = Some(column.into());
        self
    }

    /// Declare a relation.
    pub fn relation(mut self, relation: RelationSpec) -> Self {
        self.relations.insert(SmolStr::new(relation.name()), relation);
        self
    }

    /// Entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.values()
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(SmolStr::as_str)
    }

    /// Whether `name` is a declared column.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Id column name.
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Soft-delete column, if the entity uses soft deletes.
    pub fn soft_delete_column(&self) -> Option<&str> {
        self.soft_delete_column.as_deref()
    }

    /// Relation by name.
    pub fn relation_spec(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.get(name)
    }

    /// All relations in declaration order.
    pub fn relations(&self) -> impl Iterator<Item = &RelationSpec> {
        self.relations.values()
    }

    /// Relation by name, or an invalid-relation error listing the valid names.
    pub fn require_relation(&self, name: &str) -> QueryResult<&RelationSpec> {
        self.relations
            .get(name)
            .ok_or_else(|| QueryError::invalid_relation(&*self.name, name, self.relations.keys()))
    }

    fn require_column(&self, column: &str, role: &str) -> QueryResult<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(QueryError::invalid_metadata(
                &*self.name,
                format!("{} column `{}` is not declared", role, column),
            ))
        }
    }
}

/// Immutable, validated set of entity descriptors.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    entities: IndexMap<SmolStr, Arc<EntityDescriptor>>,
}

impl EntityCatalog {
    /// Start building a catalog.
    pub fn builder() -> EntityCatalogBuilder {
        EntityCatalogBuilder::default()
    }

    /// Descriptor by entity name.
    pub fn get(&self, name: &str) -> Option<&Arc<EntityDescriptor>> {
        self.entities.get(name)
    }

    /// Descriptor by entity name, or an error if it is not registered.
    pub fn entity(&self, name: &str) -> QueryResult<&EntityDescriptor> {
        self.entities
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| QueryError::invalid_metadata(name, "entity is not registered"))
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Collects descriptors and validates them as a whole.
#[derive(Debug, Default)]
pub struct EntityCatalogBuilder {
    entities: Vec<EntityDescriptor>,
}

impl EntityCatalogBuilder {
    /// Add an entity descriptor.
    pub fn entity(mut self, descriptor: EntityDescriptor) -> Self {
        self.entities.push(descriptor);
        self
    }

    /// Validate cross-entity references and freeze the catalog.
    pub fn build(self) -> QueryResult<EntityCatalog> {
        let mut entities = IndexMap::with_capacity(self.entities.len());
        for descriptor in self.entities {
            if entities.contains_key(&descriptor.name) {
                return Err(QueryError::invalid_metadata(
                    &*descriptor.name,
                    "entity is registered twice",
                ));
            }
            entities.insert(descriptor.name.clone(), Arc::new(descriptor));
        }

        for entity in entities.values() {
            validate(entity, &entities)?;
        }

        tracing::debug!(entities = entities.len(), "entity catalog built");
        Ok(EntityCatalog { entities })
    }
}

fn validate(
    entity: &EntityDescriptor,
    entities: &IndexMap<SmolStr, Arc<EntityDescriptor>>,
) -> QueryResult<()> {
    if entity.columns.is_empty() {
        return Err(QueryError::invalid_metadata(&*entity.name, "no columns declared"));
    }
    entity.require_column(&entity.id_column, "id")?;
    if let Some(soft_delete) = &entity.soft_delete_column {
        entity.require_column(soft_delete, "soft-delete")?;
    }

    for relation in entity.relations.values() {
        if entity.has_column(relation.name()) {
            return Err(QueryError::invalid_metadata(
                &*entity.name,
                format!("relation `{}` shadows a column of the same name", relation.name()),
            ));
        }
        let target = entities.get(relation.target()).ok_or_else(|| {
            QueryError::invalid_metadata(
                &*entity.name,
                format!(
                    "relation `{}` targets unknown entity `{}`",
                    relation.name(),
                    relation.target()
                ),
            )
        })?;

        let (parent_key, target_key) = match relation.kind() {
            RelationKind::BelongsTo {
                foreign_key,
                owner_key,
            } => (foreign_key, owner_key),
            RelationKind::HasOne {
                foreign_key,
                local_key,
            }
            | RelationKind::HasMany {
                foreign_key,
                local_key,
            } => (local_key, foreign_key),
            RelationKind::BelongsToMany {
                local_key,
                related_key,
                ..
            } => (local_key, related_key),
        };
        entity.require_column(parent_key, "relation key")?;
        target.require_column(target_key, "relation key")?;

        if relation.is_required() && relation.is_many() {
            return Err(QueryError::invalid_metadata(
                &*entity.name,
                format!("relation `{}` is a collection and cannot be required", relation.name()),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::relations::JoinTableSpec;

    fn users() -> EntityDescriptor {
        EntityDescriptor::new("User", "users")
            .column("id", ScalarCodec::Int)
            .column("name", ScalarCodec::Text)
            .column("deleted_at", ScalarCodec::Text)
            .soft_delete("deleted_at")
            .relation(RelationSpec::has_many("posts", "Post", "author"))
    }

    fn posts() -> EntityDescriptor {
        EntityDescriptor::new("Post", "posts")
            .column("id", ScalarCodec::Int)
            .column("author", ScalarCodec::Int)
            .column("title", ScalarCodec::Text)
            .relation(RelationSpec::belongs_to("writer", "User", "author").required())
    }

    #[test]
    fn test_codec_decode() {
        assert_eq!(ScalarCodec::Int.decode("c", Value::String(" 7".into())).unwrap(), Value::Int(7));
        assert_eq!(ScalarCodec::Float.decode("c", Value::Int(2)).unwrap(), Value::Float(2.0));
        assert_eq!(ScalarCodec::Bool.decode("c", Value::Int(1)).unwrap(), Value::Bool(true));
        assert_eq!(ScalarCodec::Bool.decode("c", Value::String("f".into())).unwrap(), Value::Bool(false));
        assert_eq!(
            ScalarCodec::Json.decode("c", Value::String("{\"a\":1}".into())).unwrap(),
            Value::Json(serde_json::json!({"a": 1}))
        );
        assert_eq!(
            ScalarCodec::Uuid
                .decode("c", Value::String("67E55044-10B1-426F-9247-BB680E5FE0C8".into()))
                .unwrap(),
            Value::String("67e55044-10b1-426f-9247-bb680e5fe0c8".into())
        );
        for codec in [ScalarCodec::Int, ScalarCodec::Text, ScalarCodec::Uuid] {
            assert_eq!(codec.decode("c", Value::Null).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_codec_rejects_mismatch() {
        let err = ScalarCodec::Int.decode("age", Value::Bool(true)).unwrap_err();
        assert!(matches!(err, RowError::TypeConversion { ref column, .. } if column == "age"));
        assert!(ScalarCodec::Bool.decode("b", Value::Int(2)).is_err());
        assert!(ScalarCodec::Uuid.decode("u", Value::String("nope".into())).is_err());
    }

    #[test]
    fn test_catalog_builds() {
        let catalog = EntityCatalog::builder().entity(users()).entity(posts()).build().unwrap();
        assert_eq!(catalog.len(), 2);

        let user = catalog.entity("User").unwrap();
        assert_eq!(user.id_column(), "id");
        assert_eq!(user.soft_delete_column(), Some("deleted_at"));
        assert_eq!(user.column_names().collect::<Vec<_>>(), vec!["id", "name", "deleted_at"]);
        assert!(user.relation_spec("posts").is_some());
    }

    #[test]
    fn test_unknown_relation_lists_valid_names() {
        let catalog = EntityCatalog::builder().entity(users()).entity(posts()).build().unwrap();
        let err = catalog.entity("User").unwrap().require_relation("comments").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRelation);
        assert!(err.message.contains("posts"));
    }

    #[test]
    fn test_catalog_rejects_missing_target() {
        let err = EntityCatalog::builder().entity(users()).build().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidMetadata);
        assert!(err.message.contains("Post"));
    }

    #[test]
    fn test_catalog_rejects_missing_key_column() {
        let broken = EntityDescriptor::new("Post", "posts")
            .column("id", ScalarCodec::Int)
            .column("title", ScalarCodec::Text);
        let err = EntityCatalog::builder().entity(users()).entity(broken).build().unwrap_err();
        assert!(err.message.contains("author"));
    }

    #[test]
    fn test_catalog_rejects_undeclared_id_and_soft_delete() {
        let no_id = EntityDescriptor::new("Tag", "tags").column("label", ScalarCodec::Text);
        assert!(EntityCatalog::builder().entity(no_id).build().is_err());

        let no_col = EntityDescriptor::new("Tag", "tags")
            .column("id", ScalarCodec::Int)
            .soft_delete("removed_at");
        assert!(EntityCatalog::builder().entity(no_col).build().is_err());
    }

    #[test]
    fn test_catalog_checks_pivot_keys() {
        let post = EntityDescriptor::new("Post", "posts")
            .column("id", ScalarCodec::Int)
            .relation(RelationSpec::belongs_to_many(
                "tags",
                "Tag",
                JoinTableSpec::new("post_tags", "post_id", "tag_id"),
            ));
        let tag = EntityDescriptor::new("Tag", "tags").column("id", ScalarCodec::Int);
        assert!(EntityCatalog::builder().entity(post).entity(tag).build().is_ok());
    }

    #[test]
    fn test_required_collection_is_rejected() {
        let user = EntityDescriptor::new("User", "users")
            .column("id", ScalarCodec::Int)
            .relation(RelationSpec::has_many("posts", "Post", "author").required());
        let post = EntityDescriptor::new("Post", "posts")
            .column("id", ScalarCodec::Int)
            .column("author", ScalarCodec::Int);
        let err = EntityCatalog::builder().entity(user).entity(post).build().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidMetadata);
    }
}
