use super::payload::{RelationPayload, ToOneAction};
use super::{CreateOperation, RelationHook, UpdateOperation};
use crate::config::EngineConfig;
use crate::context::{CreateContext, RequestContext, UpdateContext};
use crate::error::{LinkError, LinkResult};
use crate::record::{Record, record_id};
use crate::relation::{KeyHolderSide, RelationField, ToOneLinkSide};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

fn to_value(record: Option<Record>) -> Value {
    record.map(Value::Object).unwrap_or(Value::Null)
}

/// Resolve a to-one sub-document, logging operations dropped by precedence.
fn resolve_action(field: &RelationField, payload: RelationPayload) -> LinkResult<Option<ToOneAction>> {
    let payload = payload.into_one(&field.field)?;
    let present = payload.present();
    let action = payload.into_action();
    if present.len() > 1 {
        tracing::debug!(
            target: "nestlink.hook",
            model = %field.model,
            field = %field.field,
            requested = ?present,
            "only the highest-precedence operation runs"
        );
    }
    Ok(action)
}

/// To-one field whose model stores the foreign key (many side, owning side).
///
/// The relation operation produces a fragment that is merged into the
/// model's own write, so the base operation runs exactly once.
pub struct KeyHolderHook {
    field: RelationField,
    side: Arc<dyn KeyHolderSide>,
    id_field: String,
}

impl KeyHolderHook {
    pub fn new(field: RelationField, side: Arc<dyn KeyHolderSide>, config: &EngineConfig) -> Self {
        Self {
            field,
            side,
            id_field: config.id_field.clone(),
        }
    }

    async fn fragment(
        &self,
        action: ToOneAction,
        holder: Option<&Value>,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        tracing::debug!(
            target: "nestlink.hook",
            model = %self.field.model,
            field = %self.field.field,
            op = %action.op(),
            request_id = ctx.request_id().unwrap_or("-"),
            "merge foreign key"
        );
        match action {
            ToOneAction::Connect(id) => self.side.connect_fragment(&id, ctx).await,
            ToOneAction::Create(data) => self.side.create_fragment(data, ctx).await,
            ToOneAction::Disconnect => Ok(self.side.disconnect_fragment()),
            ToOneAction::Delete => match holder {
                Some(holder) => self.side.delete_fragment(holder, ctx).await,
                None => Err(LinkError::validation(format!(
                    "`{}.delete` needs an existing {}",
                    self.field.field, self.field.model
                ))),
            },
        }
    }
}

#[async_trait]
impl RelationHook for KeyHolderHook {
    fn relation_field(&self) -> &RelationField {
        &self.field
    }

    async fn wrap_create(
        &self,
        mut ctx: CreateContext,
        next: &dyn CreateOperation,
    ) -> LinkResult<CreateContext> {
        let Some(payload) = ctx.take_relation(&self.field.field) else {
            return next.execute(ctx).await;
        };
        if let Some(action) = resolve_action(&self.field, payload)? {
            let fragment = self.fragment(action, None, &ctx.request).await?;
            ctx.data.extend(fragment);
        }
        next.execute(ctx).await
    }

    async fn wrap_update(
        &self,
        mut ctx: UpdateContext,
        next: &dyn UpdateOperation,
    ) -> LinkResult<UpdateContext> {
        let Some(payload) = ctx.take_relation(&self.field.field) else {
            return next.execute(ctx).await;
        };
        if let Some(action) = resolve_action(&self.field, payload)? {
            let holder = ctx.target_id(&self.id_field)?;
            let fragment = self.fragment(action, Some(&holder), &ctx.request).await?;
            ctx.data.extend(fragment);
        }
        next.execute(ctx).await
    }

    async fn resolve(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Value> {
        Ok(to_value(self.side.resolve(parent, ctx).await?))
    }
}

/// To-one field whose model does not store the key (referenced side).
///
/// The base operation runs first; the relation operation then writes to the
/// owning record using the id just written.
pub struct ToOneLinkHook {
    field: RelationField,
    side: Arc<dyn ToOneLinkSide>,
    id_field: String,
}

impl ToOneLinkHook {
    pub fn new(field: RelationField, side: Arc<dyn ToOneLinkSide>, config: &EngineConfig) -> Self {
        Self {
            field,
            side,
            id_field: config.id_field.clone(),
        }
    }

    async fn link(&self, own_id: &Value, action: ToOneAction, ctx: &RequestContext) -> LinkResult<()> {
        tracing::debug!(
            target: "nestlink.hook",
            model = %self.field.model,
            field = %self.field.field,
            op = %action.op(),
            request_id = ctx.request_id().unwrap_or("-"),
            "link after write"
        );
        match action {
            ToOneAction::Connect(other) => self.side.connect(own_id, &other, ctx).await,
            ToOneAction::Create(data) => self.side.create(own_id, data, ctx).await,
            ToOneAction::Disconnect => self.side.disconnect(own_id, ctx).await,
            ToOneAction::Delete => self.side.delete(own_id, ctx).await,
        }
    }
}

#[async_trait]
impl RelationHook for ToOneLinkHook {
    fn relation_field(&self) -> &RelationField {
        &self.field
    }

    async fn wrap_create(
        &self,
        mut ctx: CreateContext,
        next: &dyn CreateOperation,
    ) -> LinkResult<CreateContext> {
        let Some(payload) = ctx.take_relation(&self.field.field) else {
            return next.execute(ctx).await;
        };
        let action = resolve_action(&self.field, payload)?;
        let ctx = next.execute(ctx).await?;
        if let Some(action) = action {
            let own_id = record_id(ctx.response()?, &self.id_field)?;
            self.link(&own_id, action, &ctx.request).await?;
        }
        Ok(ctx)
    }

    async fn wrap_update(
        &self,
        mut ctx: UpdateContext,
        next: &dyn UpdateOperation,
    ) -> LinkResult<UpdateContext> {
        let Some(payload) = ctx.take_relation(&self.field.field) else {
            return next.execute(ctx).await;
        };
        let action = resolve_action(&self.field, payload)?;
        let own_id = ctx.target_id(&self.id_field)?;
        let ctx = next.execute(ctx).await?;
        if let Some(action) = action {
            self.link(&own_id, action, &ctx.request).await?;
        }
        Ok(ctx)
    }

    async fn resolve(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Value> {
        Ok(to_value(self.side.resolve(parent, ctx).await?))
    }
}
