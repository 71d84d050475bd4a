//! Hydrated entities.
//!
//! A [`Record`] owns its scalar fields and, through [`Related`], every
//! record linked beneath it. Callers either read records directly or turn
//! them into their own types with [`FromRecord`].

use indexmap::IndexMap;
use serde::Serialize;
use smol_str::SmolStr;

use crate::error::{QueryError, QueryResult};
use crate::row::RowError;
use crate::value::Value;

/// Related records stored under a relation name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Related {
    /// Cardinality-one slot, empty when nothing matched.
    One(Option<Box<Record>>),
    /// Cardinality-many collection in row order.
    Many(Vec<Record>),
}

impl Related {
    /// Single related record, if this is a filled one-slot.
    pub fn as_one(&self) -> Option<&Record> {
        match self {
            Self::One(slot) => slot.as_deref(),
            Self::Many(_) => None,
        }
    }

    /// Related collection, empty for one-slots.
    pub fn as_many(&self) -> &[Record] {
        match self {
            Self::Many(items) => items,
            Self::One(_) => &[],
        }
    }
}

/// One hydrated entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(skip)]
    entity: SmolStr,
    #[serde(skip)]
    id: Value,
    #[serde(flatten)]
    fields: IndexMap<SmolStr, Value>,
    #[serde(flatten)]
    relations: IndexMap<SmolStr, Related>,
}

impl Record {
    /// Create a record with no fields yet.
    pub fn new(entity: impl Into<SmolStr>, id: Value) -> Self {
        Self {
            entity: entity.into(),
            id,
            fields: IndexMap::new(),
            relations: IndexMap::new(),
        }
    }

    /// Entity name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Identity value.
    pub fn id(&self) -> &Value {
        &self.id
    }

    /// Set a scalar field.
    pub fn set(&mut self, name: impl Into<SmolStr>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Raw scalar field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Scalar field converted to `T`.
    pub fn get_as<T: FromValue>(&self, name: &str) -> QueryResult<T> {
        let value = self.fields.get(name).ok_or_else(|| {
            QueryError::unknown_column(&*self.entity, name).with_entity(&*self.entity)
        })?;
        T::from_value(name, value).map_err(QueryError::from)
    }

    /// Scalar fields in column order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Relation slot by name.
    pub fn related(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    /// Mutable relation slot by name.
    pub fn related_mut(&mut self, name: &str) -> Option<&mut Related> {
        self.relations.get_mut(name)
    }

    /// Replace a relation slot.
    pub fn set_related(&mut self, name: impl Into<SmolStr>, related: Related) {
        self.relations.insert(name.into(), related);
    }

    /// The record linked through a cardinality-one relation.
    pub fn one(&self, name: &str) -> Option<&Record> {
        self.relations.get(name).and_then(Related::as_one)
    }

    /// The records linked through a cardinality-many relation.
    pub fn many(&self, name: &str) -> &[Record] {
        self.relations.get(name).map(Related::as_many).unwrap_or(&[])
    }

    /// Relation names in the order they were initialised.
    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(SmolStr::as_str)
    }

    /// Render the record and everything below it as JSON.
    pub fn to_json(&self) -> QueryResult<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| QueryError::internal(format!("record serialization failed: {}", e)))
    }
}

/// Conversion from a decoded field value.
pub trait FromValue: Sized {
    /// Convert `value`, read from `column`.
    fn from_value(column: &str, value: &Value) -> Result<Self, RowError>;
}

fn type_error(column: &str, expected: &str, value: &Value) -> RowError {
    if value.is_null() {
        return RowError::UnexpectedNull(column.to_string());
    }
    RowError::TypeConversion {
        column: column.to_string(),
        message: format!("expected {}, found {}", expected, value.kind()),
    }
}

impl FromValue for i64 {
    fn from_value(column: &str, value: &Value) -> Result<Self, RowError> {
        match value {
            Value::Int(i) => Ok(*i),
            other => Err(type_error(column, "int", other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(column: &str, value: &Value) -> Result<Self, RowError> {
        let wide = i64::from_value(column, value)?;
        i32::try_from(wide).map_err(|e| RowError::TypeConversion {
            column: column.to_string(),
            message: e.to_string(),
        })
    }
}

impl FromValue for f64 {
    fn from_value(column: &str, value: &Value) -> Result<Self, RowError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            other => Err(type_error(column, "float", other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(column: &str, value: &Value) -> Result<Self, RowError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(type_error(column, "bool", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(column: &str, value: &Value) -> Result<Self, RowError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(type_error(column, "string", other)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(column: &str, value: &Value) -> Result<Self, RowError> {
        match value {
            Value::Json(j) => Ok(j.clone()),
            Value::Null => Err(RowError::UnexpectedNull(column.to_string())),
            other => serde_json::to_value(other).map_err(|e| RowError::TypeConversion {
                column: column.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

impl FromValue for Value {
    fn from_value(_column: &str, value: &Value) -> Result<Self, RowError> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(column: &str, value: &Value) -> Result<Self, RowError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(column, value).map(Some)
        }
    }
}

/// Conversion from a hydrated record into a caller type.
pub trait FromRecord: Sized {
    /// Build `Self` from `record`, consuming it.
    fn from_record(record: Record) -> QueryResult<Self>;
}

impl FromRecord for Record {
    fn from_record(record: Record) -> QueryResult<Self> {
        Ok(record)
    }
}

impl FromRecord for serde_json::Value {
    fn from_record(record: Record) -> QueryResult<Self> {
        record.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    fn user() -> Record {
        let mut user = Record::new("User", Value::Int(1));
        user.set("id", Value::Int(1));
        user.set("name", Value::String("A".into()));
        user.set("nickname", Value::Null);
        user
    }

    #[test]
    fn test_typed_access() {
        let user = user();
        assert_eq!(user.get_as::<i64>("id").unwrap(), 1);
        assert_eq!(user.get_as::<String>("name").unwrap(), "A");
        assert_eq!(user.get_as::<Option<String>>("nickname").unwrap(), None);
        assert_eq!(user.get_as::<f64>("id").unwrap(), 1.0);
    }

    #[test]
    fn test_typed_access_errors() {
        let user = user();
        assert_eq!(user.get_as::<bool>("name").unwrap_err().code, ErrorCode::InvalidDataType);
        assert_eq!(
            user.get_as::<String>("nickname").unwrap_err().code,
            ErrorCode::DeserializationError
        );
        assert_eq!(user.get_as::<i64>("missing").unwrap_err().code, ErrorCode::UnknownColumn);
    }

    #[test]
    fn test_relations_and_json() {
        let mut user = user();
        let mut post = Record::new("Post", Value::Int(10));
        post.set("title", Value::String("A1".into()));
        user.set_related("posts", Related::Many(vec![post]));
        user.set_related("profile", Related::One(None));

        assert_eq!(user.many("posts").len(), 1);
        assert!(user.one("profile").is_none());
        assert!(user.many("profile").is_empty());

        assert_eq!(
            user.to_json().unwrap(),
            serde_json::json!({
                "id": 1,
                "name": "A",
                "nickname": null,
                "posts": [{ "title": "A1" }],
                "profile": null
            })
        );
    }
}
