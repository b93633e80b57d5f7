//! Declarative relation descriptors.

/// The shape of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// `source` has many `target`s; the key lives on `target`.
    OneToMany,
    /// Both sides declare a to-one field; one side owns the key.
    BiOneToOne,
    /// Only `source` declares the field and owns the key.
    UniOneToOne,
    /// Membership rows in a join table.
    ManyToMany,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToMany => "one_to_many",
            Self::BiOneToOne => "bi_one_to_one",
            Self::UniOneToOne => "uni_one_to_one",
            Self::ManyToMany => "many_to_many",
        }
    }
}

/// Shape-specific settings. Unset values fall back to naming defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationMetadata {
    /// Foreign key field name (one-to-many and one-to-one).
    pub foreign_key: Option<String>,
    /// Model that stores the key of a bidirectional one-to-one.
    pub owning_side: Option<String>,
    /// Join table name (many-to-many).
    pub join_table: Option<String>,
    /// Join table column referencing `source` (many-to-many).
    pub source_key: Option<String>,
    /// Join table column referencing `target` (many-to-many).
    pub target_key: Option<String>,
}

/// A declared relation between two models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRelation {
    pub kind: RelationKind,
    pub source: String,
    pub source_field: String,
    pub target: String,
    /// Field on `target` pointing back at `source`; `None` for unidirectional relations.
    pub target_field: Option<String>,
    pub metadata: RelationMetadata,
}

impl ModelRelation {
    fn new(
        kind: RelationKind,
        source: impl Into<String>,
        source_field: impl Into<String>,
        target: impl Into<String>,
        target_field: Option<String>,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            source_field: source_field.into(),
            target: target.into(),
            target_field,
            metadata: RelationMetadata::default(),
        }
    }

    /// `source.source_field` lists many `target`s; `target.target_field` (if any) points back.
    pub fn one_to_many(
        source: impl Into<String>,
        source_field: impl Into<String>,
        target: impl Into<String>,
        target_field: Option<&str>,
    ) -> Self {
        Self::new(
            RelationKind::OneToMany,
            source,
            source_field,
            target,
            target_field.map(str::to_string),
        )
    }

    pub fn bi_one_to_one(
        source: impl Into<String>,
        source_field: impl Into<String>,
        target: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self::new(
            RelationKind::BiOneToOne,
            source,
            source_field,
            target,
            Some(target_field.into()),
        )
    }

    pub fn uni_one_to_one(
        source: impl Into<String>,
        source_field: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::UniOneToOne, source, source_field, target, None)
    }

    pub fn many_to_many(
        source: impl Into<String>,
        source_field: impl Into<String>,
        target: impl Into<String>,
        target_field: Option<&str>,
    ) -> Self {
        Self::new(
            RelationKind::ManyToMany,
            source,
            source_field,
            target,
            target_field.map(str::to_string),
        )
    }

    pub fn with_foreign_key(mut self, key: impl Into<String>) -> Self {
        self.metadata.foreign_key = Some(key.into());
        self
    }

    /// Select the model storing the key of a bidirectional one-to-one.
    pub fn owned_by(mut self, model: impl Into<String>) -> Self {
        self.metadata.owning_side = Some(model.into());
        self
    }

    pub fn through(mut self, join_table: impl Into<String>) -> Self {
        self.metadata.join_table = Some(join_table.into());
        self
    }

    pub fn with_join_keys(
        mut self,
        source_key: impl Into<String>,
        target_key: impl Into<String>,
    ) -> Self {
        self.metadata.source_key = Some(source_key.into());
        self.metadata.target_key = Some(target_key.into());
        self
    }
}
