//! Lifecycle hooks around create and update mutations.
//!
//! Each relation field gets one [`RelationHook`]. A hook intercepts the base
//! write of its model in one of two ways:
//!
//! - **key holder** ([`KeyHolderHook`]): the model stores the foreign key, so
//!   the relation operation yields a payload fragment that is merged into the
//!   pending write. The base operation runs exactly once.
//! - **linked** ([`ToOneLinkHook`], [`ToManyLinkHook`]): the key lives
//!   elsewhere. The base operation runs first; relation operations then write
//!   to the other records using the id of the record just written.
//!
//! Hooks of one model compose by chaining in declaration order; see
//! [`ModelHooks`].

mod batch;
mod map;
mod payload;
mod to_many;
mod to_one;

pub use map::{HookMap, ModelHooks};
pub use payload::{
    PayloadMode, RelationOp, RelationPayload, ToManyPayload, ToOneAction, ToOnePayload,
    split_relations,
};
pub use to_many::ToManyLinkHook;
pub use to_one::{KeyHolderHook, ToOneLinkHook};

use crate::config::EngineConfig;
use crate::context::{CreateContext, RequestContext, UpdateContext};
use crate::error::LinkResult;
use crate::record::Record;
use crate::relation::{
    Cardinality, ManySide, ManyToManySide, OneSide, OwningSide, RefSide, Relation,
    RelationField, Side,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// The write a hook wraps: either the base storage call or the next hook in the chain.
#[async_trait]
pub trait CreateOperation: Send + Sync {
    async fn execute(&self, ctx: CreateContext) -> LinkResult<CreateContext>;
}

#[async_trait]
pub trait UpdateOperation: Send + Sync {
    async fn execute(&self, ctx: UpdateContext) -> LinkResult<UpdateContext>;
}

/// Hook contributed by one relation field of one model.
#[async_trait]
pub trait RelationHook: Send + Sync {
    /// The relation field this hook serves.
    fn relation_field(&self) -> &RelationField;

    fn model(&self) -> &str {
        &self.relation_field().model
    }

    fn field(&self) -> &str {
        &self.relation_field().field
    }

    fn cardinality(&self) -> Cardinality {
        self.relation_field().cardinality
    }

    async fn wrap_create(
        &self,
        ctx: CreateContext,
        next: &dyn CreateOperation,
    ) -> LinkResult<CreateContext> {
        next.execute(ctx).await
    }

    async fn wrap_update(
        &self,
        ctx: UpdateContext,
        next: &dyn UpdateOperation,
    ) -> LinkResult<UpdateContext> {
        next.execute(ctx).await
    }

    /// Resolve the field for `parent`: an object, `null`, or a list. Never writes.
    async fn resolve(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Value>;
}

/// Remaining hooks of a chain followed by the base create.
pub(crate) struct CreateChain<'a> {
    pub(crate) hooks: &'a [Arc<dyn RelationHook>],
    pub(crate) base: &'a dyn CreateOperation,
}

#[async_trait]
impl CreateOperation for CreateChain<'_> {
    async fn execute(&self, ctx: CreateContext) -> LinkResult<CreateContext> {
        match self.hooks.split_first() {
            None => self.base.execute(ctx).await,
            Some((hook, rest)) => {
                let next = CreateChain {
                    hooks: rest,
                    base: self.base,
                };
                hook.wrap_create(ctx, &next).await
            }
        }
    }
}

pub(crate) struct UpdateChain<'a> {
    pub(crate) hooks: &'a [Arc<dyn RelationHook>],
    pub(crate) base: &'a dyn UpdateOperation,
}

#[async_trait]
impl UpdateOperation for UpdateChain<'_> {
    async fn execute(&self, ctx: UpdateContext) -> LinkResult<UpdateContext> {
        match self.hooks.split_first() {
            None => self.base.execute(ctx).await,
            Some((hook, rest)) => {
                let next = UpdateChain {
                    hooks: rest,
                    base: self.base,
                };
                hook.wrap_update(ctx, &next).await
            }
        }
    }
}

/// Build the hooks of one relation, one per declared relation field.
pub fn build_hook_map(relation: &Relation, config: &EngineConfig) -> LinkResult<HookMap> {
    let fields = relation.fields();
    let field_of = |model: &str, field: &str| {
        fields
            .iter()
            .find(|f| f.model == model && f.field == field)
            .cloned()
    };

    let mut hooks: Vec<Arc<dyn RelationHook>> = Vec::new();
    match relation {
        Relation::OneToMany(r) => {
            if let Some(field) = field_of(r.one_side_model(), r.one_side_field()) {
                hooks.push(Arc::new(ToManyLinkHook::new(
                    field,
                    Arc::new(OneSide(r.clone())),
                    config,
                )));
            }
            if let Some(many_field) = r.many_side_field()
                && let Some(field) = field_of(r.many_side_model(), many_field)
            {
                hooks.push(Arc::new(KeyHolderHook::new(
                    field,
                    Arc::new(ManySide(r.clone())),
                    config,
                )));
            }
        }
        Relation::BiOneToOne(r) => {
            if let Some(field) = field_of(r.owning_side(), r.owning_side_field()) {
                hooks.push(Arc::new(KeyHolderHook::new(
                    field,
                    Arc::new(OwningSide(r.clone())),
                    config,
                )));
            }
            if let Some(field) = field_of(r.ref_side(), r.ref_side_field()) {
                hooks.push(Arc::new(ToOneLinkHook::new(
                    field,
                    Arc::new(RefSide(r.clone())),
                    config,
                )));
            }
        }
        Relation::UniOneToOne(r) => {
            if let Some(field) = field_of(r.owning_side(), r.field()) {
                hooks.push(Arc::new(KeyHolderHook::new(field, r.clone(), config)));
            }
        }
        Relation::ManyToMany(r) => {
            if let Some(field) = field_of(r.source_model(), r.source_field()) {
                hooks.push(Arc::new(ToManyLinkHook::new(
                    field,
                    Arc::new(ManyToManySide::new(r.clone(), Side::Source)),
                    config,
                )));
            }
            if let Some(target_field) = r.target_field()
                && let Some(field) = field_of(r.target_model(), target_field)
            {
                hooks.push(Arc::new(ToManyLinkHook::new(
                    field,
                    Arc::new(ManyToManySide::new(r.clone(), Side::Target)),
                    config,
                )));
            }
        }
    }

    let mut map = HookMap::new();
    for hook in hooks {
        map.insert(hook)?;
    }
    Ok(map)
}
