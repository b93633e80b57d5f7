//! Relation implementations.
//!
//! Each relation shape is a stateless struct built once from a
//! [`ModelRelation`] and shared by every request. Its sides are exposed to the
//! hook layer through three capability traits:
//!
//! - [`KeyHolderSide`]: the side whose own write can carry the foreign key
//!   (many side, owning side). Link operations return a payload fragment.
//! - [`ToOneLinkSide`]: a to-one side without the key (referenced side). Link
//!   operations write to the other record after this side's write.
//! - [`ToManyLinkSide`]: a to-many side. Link operations run once per id.
//!
//! Joins never write.

mod bi_one_to_one;
mod descriptor;
mod many_to_many;
mod one_to_many;
mod uni_one_to_one;

pub use bi_one_to_one::{BiOneToOneRelation, OwningSide, RefSide};
pub use descriptor::{ModelRelation, RelationKind, RelationMetadata};
pub use many_to_many::{ManyToManyRelation, ManyToManySide, Side};
pub use one_to_many::{ManySide, OneSide, OneToManyRelation};
pub use uni_one_to_one::UniOneToOneRelation;

use crate::context::RequestContext;
use crate::datasource::ModelStore;
use crate::error::{LinkError, LinkResult};
use crate::record::{Id, Record};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Whether a relation field resolves to one record or a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// A relation field as seen from one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationField {
    pub model: String,
    pub field: String,
    pub target: String,
    pub cardinality: Cardinality,
}

/// Side whose own pending write carries the foreign key.
#[async_trait]
pub trait KeyHolderSide: Send + Sync {
    /// Fragment pointing the key at an existing record. `NotFound` if `id` does not exist.
    async fn connect_fragment(&self, id: &Id, ctx: &RequestContext) -> LinkResult<Record>;

    /// Create the referenced record, then return the fragment pointing at it.
    async fn create_fragment(&self, data: Record, ctx: &RequestContext) -> LinkResult<Record>;

    /// Fragment clearing the key.
    fn disconnect_fragment(&self) -> Record;

    /// Delete the record currently referenced by `holder_id`, then return the clearing fragment.
    async fn delete_fragment(&self, holder_id: &Id, ctx: &RequestContext) -> LinkResult<Record>;

    async fn resolve(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Option<Record>>;
}

/// To-one side linked through a secondary write on the other record.
#[async_trait]
pub trait ToOneLinkSide: Send + Sync {
    async fn connect(&self, own_id: &Id, other_id: &Id, ctx: &RequestContext) -> LinkResult<()>;

    async fn create(&self, own_id: &Id, data: Record, ctx: &RequestContext) -> LinkResult<()>;

    async fn disconnect(&self, own_id: &Id, ctx: &RequestContext) -> LinkResult<()>;

    async fn delete(&self, own_id: &Id, ctx: &RequestContext) -> LinkResult<()>;

    async fn resolve(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Option<Record>>;
}

/// To-many side; every operation targets a single related record.
#[async_trait]
pub trait ToManyLinkSide: Send + Sync {
    async fn connect(&self, own_id: &Id, other_id: &Id, ctx: &RequestContext) -> LinkResult<()>;

    async fn create(&self, own_id: &Id, data: Record, ctx: &RequestContext) -> LinkResult<()>;

    async fn disconnect(&self, own_id: &Id, other_id: &Id, ctx: &RequestContext)
    -> LinkResult<()>;

    async fn delete(&self, own_id: &Id, other_id: &Id, ctx: &RequestContext) -> LinkResult<()>;

    async fn resolve(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Vec<Record>>;
}

/// A relation implementation, one variant per shape.
#[derive(Debug, Clone)]
pub enum Relation {
    OneToMany(Arc<OneToManyRelation>),
    BiOneToOne(Arc<BiOneToOneRelation>),
    UniOneToOne(Arc<UniOneToOneRelation>),
    ManyToMany(Arc<ManyToManyRelation>),
}

impl Relation {
    /// Instantiate a descriptor against the registered stores.
    pub fn new(descriptor: &ModelRelation, stores: &BTreeMap<String, ModelStore>) -> LinkResult<Self> {
        let store = |name: &str| {
            stores
                .get(name)
                .cloned()
                .ok_or_else(|| LinkError::config(format!("no data source registered for `{name}`")))
        };
        let source = store(&descriptor.source)?;
        let target = store(&descriptor.target)?;
        let meta = &descriptor.metadata;

        let relation = match descriptor.kind {
            RelationKind::OneToMany => Self::OneToMany(Arc::new(OneToManyRelation::new(
                source,
                target,
                descriptor.source_field.clone(),
                descriptor.target_field.clone(),
                meta.foreign_key.clone(),
            ))),
            RelationKind::BiOneToOne => {
                let target_field = descriptor.target_field.clone().ok_or_else(|| {
                    LinkError::config(format!(
                        "bidirectional one-to-one `{}.{}` needs a field on `{}`",
                        descriptor.source, descriptor.source_field, descriptor.target
                    ))
                })?;
                Self::BiOneToOne(Arc::new(BiOneToOneRelation::new(
                    source,
                    target,
                    descriptor.source_field.clone(),
                    target_field,
                    meta.foreign_key.clone(),
                    meta.owning_side.as_deref(),
                )?))
            }
            RelationKind::UniOneToOne => Self::UniOneToOne(Arc::new(UniOneToOneRelation::new(
                source,
                target,
                descriptor.source_field.clone(),
                meta.foreign_key.clone(),
            ))),
            RelationKind::ManyToMany => {
                let join_name = meta.join_table.clone().unwrap_or_else(|| {
                    format!("{}_{}", descriptor.source, descriptor.target)
                });
                let join = store(&join_name)?;
                Self::ManyToMany(Arc::new(ManyToManyRelation::new(
                    source,
                    target,
                    join,
                    descriptor.source_field.clone(),
                    descriptor.target_field.clone(),
                    meta.source_key.clone(),
                    meta.target_key.clone(),
                )?))
            }
        };
        Ok(relation)
    }

    pub fn kind(&self) -> RelationKind {
        match self {
            Self::OneToMany(_) => RelationKind::OneToMany,
            Self::BiOneToOne(_) => RelationKind::BiOneToOne,
            Self::UniOneToOne(_) => RelationKind::UniOneToOne,
            Self::ManyToMany(_) => RelationKind::ManyToMany,
        }
    }

    /// Model whose records store the foreign key. `None` when membership lives in a join table.
    pub fn foreign_key_owner(&self) -> Option<&str> {
        match self {
            Self::OneToMany(r) => Some(r.many_side_model()),
            Self::BiOneToOne(r) => Some(r.owning_side()),
            Self::UniOneToOne(r) => Some(r.owning_side()),
            Self::ManyToMany(_) => None,
        }
    }

    pub fn foreign_key(&self) -> Option<&str> {
        match self {
            Self::OneToMany(r) => Some(r.foreign_key()),
            Self::BiOneToOne(r) => Some(r.foreign_key()),
            Self::UniOneToOne(r) => Some(r.foreign_key()),
            Self::ManyToMany(_) => None,
        }
    }

    /// Every relation field this relation declares, one per participating side.
    pub fn fields(&self) -> Vec<RelationField> {
        let field = |model: &str, field: &str, target: &str, cardinality| RelationField {
            model: model.to_string(),
            field: field.to_string(),
            target: target.to_string(),
            cardinality,
        };
        let mut fields = Vec::new();
        match self {
            Self::OneToMany(r) => {
                fields.push(field(
                    r.one_side_model(),
                    r.one_side_field(),
                    r.many_side_model(),
                    Cardinality::Many,
                ));
                if let Some(many_field) = r.many_side_field() {
                    fields.push(field(
                        r.many_side_model(),
                        many_field,
                        r.one_side_model(),
                        Cardinality::One,
                    ));
                }
            }
            Self::BiOneToOne(r) => {
                fields.push(field(
                    r.owning_side(),
                    r.owning_side_field(),
                    r.ref_side(),
                    Cardinality::One,
                ));
                fields.push(field(
                    r.ref_side(),
                    r.ref_side_field(),
                    r.owning_side(),
                    Cardinality::One,
                ));
            }
            Self::UniOneToOne(r) => {
                fields.push(field(
                    r.owning_side(),
                    r.field(),
                    r.referenced_side(),
                    Cardinality::One,
                ));
            }
            Self::ManyToMany(r) => {
                fields.push(field(
                    r.source_model(),
                    r.source_field(),
                    r.target_model(),
                    Cardinality::Many,
                ));
                if let Some(target_field) = r.target_field() {
                    fields.push(field(
                        r.target_model(),
                        target_field,
                        r.source_model(),
                        Cardinality::Many,
                    ));
                }
            }
        }
        fields
    }
}

/// `{key: value}`
pub(crate) fn key_fragment(key: &str, value: Value) -> Record {
    let mut fragment = Record::new();
    fragment.insert(key.to_string(), value);
    fragment
}
