//! Relation specification types.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{QueryError, QueryResult};
use crate::record::{Record, Related};
use crate::sql::{SqlBuilder, qualify, quote_identifier};

const DEFAULT_KEY: &str = "id";

/// Number of records a relation links to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// At most one related record.
    One,
    /// Any number of related records.
    Many,
}

/// What to do when a cardinality-one relation meets a second distinct record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToOneConflict {
    /// Fail with a not-unique error.
    #[default]
    Error,
    /// Keep the record seen last.
    LastWriteWins,
}

/// How the parent and target tables are keyed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// Parent holds `foreign_key` pointing at the target's `owner_key`.
    BelongsTo {
        foreign_key: SmolStr,
        owner_key: SmolStr,
    },
    /// Target holds `foreign_key` pointing at the parent's `local_key`; one match.
    HasOne {
        foreign_key: SmolStr,
        local_key: SmolStr,
    },
    /// Target holds `foreign_key` pointing at the parent's `local_key`; many matches.
    HasMany {
        foreign_key: SmolStr,
        local_key: SmolStr,
    },
    /// Parent and target are linked through a pivot table.
    BelongsToMany {
        pivot: JoinTableSpec,
        local_key: SmolStr,
        related_key: SmolStr,
    },
}

/// A named relation from one entity to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    name: SmolStr,
    target: SmolStr,
    kind: RelationKind,
    required: bool,
}

impl RelationSpec {
    fn new(name: impl Into<SmolStr>, target: impl Into<SmolStr>, kind: RelationKind) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind,
            required: false,
        }
    }

    /// `parent.foreign_key = target.id`.
    pub fn belongs_to(
        name: impl Into<SmolStr>,
        target: impl Into<SmolStr>,
        foreign_key: impl Into<SmolStr>,
    ) -> Self {
        Self::new(
            name,
            target,
            RelationKind::BelongsTo {
                foreign_key: foreign_key.into(),
                owner_key: SmolStr::new_static(DEFAULT_KEY),
            },
        )
    }

    /// `target.foreign_key = parent.id`, at most one match.
    pub fn has_one(
        name: impl Into<SmolStr>,
        target: impl Into<SmolStr>,
        foreign_key: impl Into<SmolStr>,
    ) -> Self {
        Self::new(
            name,
            target,
            RelationKind::HasOne {
                foreign_key: foreign_key.into(),
                local_key: SmolStr::new_static(DEFAULT_KEY),
            },
        )
    }

    /// `target.foreign_key = parent.id`, any number of matches.
    pub fn has_many(
        name: impl Into<SmolStr>,
        target: impl Into<SmolStr>,
        foreign_key: impl Into<SmolStr>,
    ) -> Self {
        Self::new(
            name,
            target,
            RelationKind::HasMany {
                foreign_key: foreign_key.into(),
                local_key: SmolStr::new_static(DEFAULT_KEY),
            },
        )
    }

    /// Many-to-many through `pivot`, keyed on both sides by `id`.
    pub fn belongs_to_many(
        name: impl Into<SmolStr>,
        target: impl Into<SmolStr>,
        pivot: JoinTableSpec,
    ) -> Self {
        Self::new(
            name,
            target,
            RelationKind::BelongsToMany {
                pivot,
                local_key: SmolStr::new_static(DEFAULT_KEY),
                related_key: SmolStr::new_static(DEFAULT_KEY),
            },
        )
    }

    /// Override the parent-side key of a has-one, has-many or many-to-many relation.
    ///
    /// Belongs-to relations key the parent by their foreign key, so this has no
    /// effect on them.
    pub fn local_key(mut self, key: impl Into<SmolStr>) -> Self {
        match &mut self.kind {
            RelationKind::HasOne { local_key, .. }
            | RelationKind::HasMany { local_key, .. }
            | RelationKind::BelongsToMany { local_key, .. } => *local_key = key.into(),
            RelationKind::BelongsTo { .. } => {}
        }
        self
    }

    /// Override the target-side key of a belongs-to or many-to-many relation.
    pub fn owner_key(mut self, key: impl Into<SmolStr>) -> Self {
        match &mut self.kind {
            RelationKind::BelongsTo { owner_key, .. } => *owner_key = key.into(),
            RelationKind::BelongsToMany { related_key, .. } => *related_key = key.into(),
            RelationKind::HasOne { .. } | RelationKind::HasMany { .. } => {}
        }
        self
    }

    /// Require a cardinality-one relation to match on every hydrated parent.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Relation name (the field it hydrates into).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target entity name.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Join strategy.
    pub fn kind(&self) -> &RelationKind {
        &self.kind
    }

    /// Whether an empty match is a hydration error.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether this relation links one or many records.
    pub fn cardinality(&self) -> Cardinality {
        match self.kind {
            RelationKind::BelongsTo { .. } | RelationKind::HasOne { .. } => Cardinality::One,
            RelationKind::HasMany { .. } | RelationKind::BelongsToMany { .. } => Cardinality::Many,
        }
    }

    /// Check if this relation returns multiple records.
    pub fn is_many(&self) -> bool {
        self.cardinality() == Cardinality::Many
    }

    /// Whether the join goes through a pivot table.
    pub fn needs_pivot(&self) -> bool {
        matches!(self.kind, RelationKind::BelongsToMany { .. })
    }

    /// Write the LEFT JOIN(s) that attach `target_table AS child_alias` to `parent_alias`.
    ///
    /// Many-to-many relations need `pivot_alias`; the caller appends any extra
    /// ON-clause predicates right after.
    pub fn write_join(
        &self,
        builder: &mut SqlBuilder,
        target_table: &str,
        parent_alias: &str,
        child_alias: &str,
        pivot_alias: Option<&str>,
    ) -> QueryResult<()> {
        let (parent_column, target_column) = match &self.kind {
            RelationKind::BelongsTo {
                foreign_key,
                owner_key,
            } => (qualify(parent_alias, foreign_key), qualify(child_alias, owner_key)),
            RelationKind::HasOne {
                foreign_key,
                local_key,
            }
            | RelationKind::HasMany {
                foreign_key,
                local_key,
            } => (qualify(parent_alias, local_key), qualify(child_alias, foreign_key)),
            RelationKind::BelongsToMany {
                pivot,
                local_key,
                related_key,
            } => {
                let pivot_alias = pivot_alias.ok_or_else(|| {
                    QueryError::internal(format!(
                        "many-to-many relation `{}` joined without a pivot alias",
                        self.name
                    ))
                })?;
                builder
                    .push(" LEFT JOIN ")
                    .push_identifier(&pivot.table_name)
                    .push(" AS ")
                    .push_identifier(pivot_alias)
                    .push(" ON ")
                    .push(qualify(parent_alias, local_key))
                    .push(" = ")
                    .push(qualify(pivot_alias, &pivot.source_column));
                (
                    qualify(pivot_alias, &pivot.target_column),
                    qualify(child_alias, related_key),
                )
            }
        };

        builder
            .push(" LEFT JOIN ")
            .push_identifier(target_table)
            .push(" AS ")
            .push(quote_identifier(child_alias))
            .push(" ON ")
            .push(parent_column)
            .push(" = ")
            .push(target_column);
        Ok(())
    }

    /// Give `parent` an empty slot or collection for this relation.
    pub fn init(&self, parent: &mut Record) {
        let empty = match self.cardinality() {
            Cardinality::One => Related::One(None),
            Cardinality::Many => Related::Many(Vec::new()),
        };
        parent.set_related(self.name.clone(), empty);
    }

    /// Link a finished child record into `parent`.
    ///
    /// Cardinality-one slots accept one distinct record; a second one is a
    /// not-unique error unless `policy` keeps the last write.
    pub fn link(&self, parent: &mut Record, child: Record, policy: ToOneConflict) -> QueryResult<()> {
        if parent.related(&self.name).is_none() {
            self.init(parent);
        }
        let entity = parent.entity().to_string();
        let Some(slot) = parent.related_mut(&self.name) else {
            return Err(QueryError::internal("relation slot vanished after init"));
        };

        match slot {
            Related::Many(items) => items.push(child),
            Related::One(current) => {
                let conflict = current
                    .as_ref()
                    .is_some_and(|existing| existing.id() != child.id());
                if current.is_none() {
                    *current = Some(Box::new(child));
                } else if conflict {
                    match policy {
                        ToOneConflict::Error => {
                            return Err(QueryError::not_unique_relation(entity, &*self.name));
                        }
                        ToOneConflict::LastWriteWins => {
                            tracing::warn!(
                                entity = %entity,
                                relation = %self.name,
                                "replacing cardinality-one relation with a later match"
                            );
                            *current = Some(Box::new(child));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Specification for a join table (many-to-many).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTableSpec {
    /// Name of the join table.
    pub table_name: SmolStr,
    /// Column referencing the source model.
    pub source_column: SmolStr,
    /// Column referencing the target model.
    pub target_column: SmolStr,
}

impl JoinTableSpec {
    /// Create a new join table spec.
    pub fn new(
        table_name: impl Into<SmolStr>,
        source_column: impl Into<SmolStr>,
        target_column: impl Into<SmolStr>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            source_column: source_column.into(),
            target_column: target_column.into(),
        }
    }
}
