use super::ToManyLinkSide;
use crate::context::RequestContext;
use crate::datasource::ModelStore;
use crate::error::{LinkError, LinkResult};
use crate::record::{Filter, Id, Record, display_id, record_id};
use async_trait::async_trait;
use futures_util::future::try_join_all;
use heck::ToLowerCamelCase;
use std::sync::Arc;

/// Which participant of a [`ManyToManyRelation`] a side represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

/// Membership rows `{sourceKey, targetKey}` in a join table.
#[derive(Debug)]
pub struct ManyToManyRelation {
    source: ModelStore,
    target: ModelStore,
    join: ModelStore,
    source_field: String,
    target_field: Option<String>,
    source_key: String,
    target_key: String,
}

impl ManyToManyRelation {
    /// Join keys default to `<source>Id` and `<target>Id`.
    pub fn new(
        source: ModelStore,
        target: ModelStore,
        join: ModelStore,
        source_field: String,
        target_field: Option<String>,
        source_key: Option<String>,
        target_key: Option<String>,
    ) -> LinkResult<Self> {
        let source_key =
            source_key.unwrap_or_else(|| format!("{}Id", source.name().to_lower_camel_case()));
        let target_key =
            target_key.unwrap_or_else(|| format!("{}Id", target.name().to_lower_camel_case()));
        if source_key == target_key {
            return Err(LinkError::config(format!(
                "join table `{}` uses `{source_key}` for both sides; set distinct join keys",
                join.name()
            )));
        }
        Ok(Self {
            source,
            target,
            join,
            source_field,
            target_field,
            source_key,
            target_key,
        })
    }

    pub fn source_model(&self) -> &str {
        self.source.name()
    }

    pub fn target_model(&self) -> &str {
        self.target.name()
    }

    pub fn source_field(&self) -> &str {
        &self.source_field
    }

    pub fn target_field(&self) -> Option<&str> {
        self.target_field.as_deref()
    }

    pub fn join_table(&self) -> &str {
        self.join.name()
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn target_key(&self) -> &str {
        &self.target_key
    }

    /// `(own store, other store, own join key, other join key)`
    fn view(&self, side: Side) -> (&ModelStore, &ModelStore, &str, &str) {
        match side {
            Side::Source => (&self.source, &self.target, &self.source_key, &self.target_key),
            Side::Target => (&self.target, &self.source, &self.target_key, &self.source_key),
        }
    }

    fn row(&self, side: Side, own_id: &Id, other_id: &Id) -> Filter {
        let (_, _, own_key, other_key) = self.view(side);
        Filter::eq(own_key, own_id.clone()).and_eq(other_key, other_id.clone())
    }

    /// Add a membership row. Existing rows are left alone.
    ///
    /// The lookup and the insert are separate storage calls; two requests
    /// adding the same pair at once rely on the join table rejecting duplicates.
    pub async fn add_id(
        &self,
        side: Side,
        own_id: &Id,
        other_id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<()> {
        let (_, other, _, _) = self.view(side);
        other.require(other_id, ctx).await?;
        let row = self.row(side, own_id, other_id);
        if self.join.find(&row, ctx).await?.is_some() {
            return Ok(());
        }
        self.join.create(row.fields().clone(), ctx).await?;
        Ok(())
    }

    pub async fn create_and_add(
        &self,
        side: Side,
        own_id: &Id,
        data: Record,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        let (_, other, _, _) = self.view(side);
        let created = other.create(data, ctx).await?;
        let other_id = record_id(&created, other.id_field())?;
        let row = self.row(side, own_id, &other_id);
        self.join.create(row.fields().clone(), ctx).await?;
        Ok(created)
    }

    pub async fn remove_id(
        &self,
        side: Side,
        own_id: &Id,
        other_id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<()> {
        let row = self.require_row(side, own_id, other_id, ctx).await?;
        self.join.delete(&row, ctx).await?;
        Ok(())
    }

    /// Delete the linked record and every membership row pointing at it.
    pub async fn delete_id(
        &self,
        side: Side,
        own_id: &Id,
        other_id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        self.require_row(side, own_id, other_id, ctx).await?;
        let (_, other, _, other_key) = self.view(side);
        let rows = self
            .join
            .find_many(&Filter::eq(other_key, other_id.clone()), ctx)
            .await?;
        for row in rows {
            self.join.delete(&Filter::from_record(row), ctx).await?;
        }
        other.delete_by_id(other_id, ctx).await
    }

    pub async fn join_many(
        &self,
        side: Side,
        parent: &Record,
        ctx: &RequestContext,
    ) -> LinkResult<Vec<Record>> {
        let (own, other, own_key, other_key) = self.view(side);
        let id = record_id(parent, own.id_field())?;
        let rows = self.join.find_many(&Filter::eq(own_key, id), ctx).await?;
        let linked = try_join_all(rows.iter().filter_map(|row| row.get(other_key)).map(
            |other_id| async move { other.find(&other.by_id(other_id), ctx).await },
        ))
        .await?;
        // rows pointing at deleted records are skipped
        Ok(linked.into_iter().flatten().collect())
    }

    async fn require_row(
        &self,
        side: Side,
        own_id: &Id,
        other_id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<Filter> {
        let row = self.row(side, own_id, other_id);
        match self.join.find(&row, ctx).await? {
            Some(_) => Ok(row),
            None => {
                let (own, other, _, _) = self.view(side);
                Err(LinkError::not_found(format!(
                    "{} {} is not linked to {} {}",
                    other.name(),
                    display_id(other_id),
                    own.name(),
                    display_id(own_id)
                )))
            }
        }
    }
}

/// One side of a [`ManyToManyRelation`].
#[derive(Debug, Clone)]
pub struct ManyToManySide {
    pub relation: Arc<ManyToManyRelation>,
    pub side: Side,
}

impl ManyToManySide {
    pub fn new(relation: Arc<ManyToManyRelation>, side: Side) -> Self {
        Self { relation, side }
    }
}

#[async_trait]
impl ToManyLinkSide for ManyToManySide {
    async fn connect(&self, own_id: &Id, other_id: &Id, ctx: &RequestContext) -> LinkResult<()> {
        self.relation.add_id(self.side, own_id, other_id, ctx).await
    }

    async fn create(&self, own_id: &Id, data: Record, ctx: &RequestContext) -> LinkResult<()> {
        self.relation
            .create_and_add(self.side, own_id, data, ctx)
            .await?;
        Ok(())
    }

    async fn disconnect(
        &self,
        own_id: &Id,
        other_id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<()> {
        self.relation
            .remove_id(self.side, own_id, other_id, ctx)
            .await
    }

    async fn delete(&self, own_id: &Id, other_id: &Id, ctx: &RequestContext) -> LinkResult<()> {
        self.relation
            .delete_id(self.side, own_id, other_id, ctx)
            .await?;
        Ok(())
    }

    async fn resolve(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Vec<Record>> {
        self.relation.join_many(self.side, parent, ctx).await
    }
}
