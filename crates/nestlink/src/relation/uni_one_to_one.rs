use super::{KeyHolderSide, key_fragment};
use crate::context::RequestContext;
use crate::datasource::ModelStore;
use crate::error::{LinkError, LinkResult};
use crate::record::{Id, Record, display_id, optional_key, record_id};
use async_trait::async_trait;
use serde_json::Value;

/// A one-to-one declared only on the owning model, which stores the key.
#[derive(Debug)]
pub struct UniOneToOneRelation {
    owning: ModelStore,
    referenced: ModelStore,
    field: String,
    foreign_key: String,
}

impl UniOneToOneRelation {
    pub fn new(
        owning: ModelStore,
        referenced: ModelStore,
        field: String,
        foreign_key: Option<String>,
    ) -> Self {
        let foreign_key = foreign_key.unwrap_or_else(|| format!("{field}Id"));
        Self {
            owning,
            referenced,
            field,
            foreign_key,
        }
    }

    pub fn owning_side(&self) -> &str {
        self.owning.name()
    }

    pub fn referenced_side(&self) -> &str {
        self.referenced.name()
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub async fn set_foreign_key(&self, id: &Id, ctx: &RequestContext) -> LinkResult<Record> {
        self.referenced.require(id, ctx).await?;
        Ok(key_fragment(&self.foreign_key, id.clone()))
    }

    pub async fn create_and_set_foreign_key(
        &self,
        data: Record,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        let created = self.referenced.create(data, ctx).await?;
        let id = record_id(&created, self.referenced.id_field())?;
        Ok(key_fragment(&self.foreign_key, id))
    }

    pub fn unset_foreign_key(&self) -> Record {
        key_fragment(&self.foreign_key, Value::Null)
    }

    pub async fn delete_and_unset_foreign_key(
        &self,
        owning_id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        let owner = self.owning.require(owning_id, ctx).await?;
        let Some(ref_id) = optional_key(&owner, &self.foreign_key) else {
            return Err(LinkError::not_found(format!(
                "{} {} has no {} to delete",
                self.owning.name(),
                display_id(owning_id),
                self.referenced.name()
            )));
        };
        self.referenced.delete_by_id(ref_id, ctx).await?;
        Ok(self.unset_foreign_key())
    }

    pub async fn join(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Option<Record>> {
        match optional_key(parent, &self.foreign_key) {
            Some(id) => self.referenced.find(&self.referenced.by_id(id), ctx).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl KeyHolderSide for UniOneToOneRelation {
    async fn connect_fragment(&self, id: &Id, ctx: &RequestContext) -> LinkResult<Record> {
        self.set_foreign_key(id, ctx).await
    }

    async fn create_fragment(&self, data: Record, ctx: &RequestContext) -> LinkResult<Record> {
        self.create_and_set_foreign_key(data, ctx).await
    }

    fn disconnect_fragment(&self) -> Record {
        self.unset_foreign_key()
    }

    async fn delete_fragment(&self, holder_id: &Id, ctx: &RequestContext) -> LinkResult<Record> {
        self.delete_and_unset_foreign_key(holder_id, ctx).await
    }

    async fn resolve(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Option<Record>> {
        self.join(parent, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MemoryDataSource;
    use serde_json::json;
    use std::sync::Arc;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn delete_clears_key_and_removes_target() {
        let users = Arc::new(
            MemoryDataSource::new("User")
                .with_records(vec![record(json!({"id": "u1", "avatarId": "i1"}))]),
        );
        let images = Arc::new(
            MemoryDataSource::new("Image").with_records(vec![record(json!({"id": "i1"}))]),
        );
        let relation = UniOneToOneRelation::new(
            ModelStore::new("User", "id", users),
            ModelStore::new("Image", "id", images.clone()),
            "avatar".into(),
            None,
        );
        let ctx = RequestContext::new();

        let fragment = relation
            .delete_and_unset_foreign_key(&json!("u1"), &ctx)
            .await
            .unwrap();
        assert_eq!(fragment, record(json!({"avatarId": null})));
        assert!(images.is_empty());

        let parent = record(json!({"id": "u1", "avatarId": "i1"}));
        assert_eq!(relation.join(&parent, &ctx).await.unwrap(), None);
    }
}
