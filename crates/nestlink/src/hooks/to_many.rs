use super::batch::run_batch;
use super::payload::{RelationOp, ToManyPayload};
use super::{CreateOperation, RelationHook, UpdateOperation};
use crate::config::EngineConfig;
use crate::context::{CreateContext, RequestContext, UpdateContext};
use crate::error::LinkResult;
use crate::record::{Id, Record, record_id};
use crate::relation::{RelationField, ToManyLinkSide};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// To-many field (one side of a one-to-many, either side of a many-to-many).
///
/// The base operation runs first. Each operation list of the sub-document is
/// then one concurrent batch; batches run one after another in
/// [`RelationOp::PRECEDENCE`] order.
pub struct ToManyLinkHook {
    field: RelationField,
    side: Arc<dyn ToManyLinkSide>,
    id_field: String,
    max_concurrency: Option<usize>,
}

impl ToManyLinkHook {
    pub fn new(field: RelationField, side: Arc<dyn ToManyLinkSide>, config: &EngineConfig) -> Self {
        Self {
            field,
            side,
            id_field: config.id_field.clone(),
            max_concurrency: config.max_batch_concurrency,
        }
    }

    /// Batches run in [`RelationOp::PRECEDENCE`] order.
    async fn run(&self, own_id: &Id, payload: ToManyPayload, ctx: &RequestContext) -> LinkResult<()> {
        let side = self.side.as_ref();
        self.batch(RelationOp::Connect, payload.connect, ctx, |other: Id| async move {
            side.connect(own_id, &other, ctx).await
        })
        .await?;
        self.batch(RelationOp::Create, payload.create, ctx, |data: Record| {
            side.create(own_id, data, ctx)
        })
        .await?;
        self.batch(RelationOp::Disconnect, payload.disconnect, ctx, |other: Id| async move {
            side.disconnect(own_id, &other, ctx).await
        })
        .await?;
        self.batch(RelationOp::Delete, payload.delete, ctx, |other: Id| async move {
            side.delete(own_id, &other, ctx).await
        })
        .await
    }

    async fn batch<T, F, Fut>(
        &self,
        op: RelationOp,
        items: Vec<T>,
        ctx: &RequestContext,
        apply: F,
    ) -> LinkResult<()>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = LinkResult<()>>,
    {
        if items.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            target: "nestlink.hook",
            model = %self.field.model,
            field = %self.field.field,
            op = %op,
            size = items.len(),
            request_id = ctx.request_id().unwrap_or("-"),
            "run batch"
        );
        run_batch(items, self.max_concurrency, apply).await
    }
}

#[async_trait]
impl RelationHook for ToManyLinkHook {
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
        let payload = payload.into_many(&self.field.field)?;
        let ctx = next.execute(ctx).await?;
        if !payload.is_empty() {
            let own_id = record_id(ctx.response()?, &self.id_field)?;
            self.run(&own_id, payload, &ctx.request).await?;
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
        let payload = payload.into_many(&self.field.field)?;
        let own_id = ctx.target_id(&self.id_field)?;
        let ctx = next.execute(ctx).await?;
        if !payload.is_empty() {
            self.run(&own_id, payload, &ctx.request).await?;
        }
        Ok(ctx)
    }

    async fn resolve(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Value> {
        let records = self.side.resolve(parent, ctx).await?;
        Ok(Value::Array(records.into_iter().map(Value::Object).collect()))
    }
}
