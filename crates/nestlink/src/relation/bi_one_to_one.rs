use super::{KeyHolderSide, ToOneLinkSide, key_fragment};
use crate::context::RequestContext;
use crate::datasource::ModelStore;
use crate::error::{LinkError, LinkResult};
use crate::record::{Filter, Id, Record, display_id, optional_key, record_id};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A one-to-one declared on both models. Only the owning side stores the key;
/// the referenced side writes through to the owning record.
#[derive(Debug)]
pub struct BiOneToOneRelation {
    owning: ModelStore,
    referenced: ModelStore,
    owning_side_field: String,
    ref_side_field: String,
    foreign_key: String,
}

impl BiOneToOneRelation {
    /// `owning_side` names the model storing the key and defaults to `model_a`.
    /// The key defaults to `<owningSideField>Id`.
    pub fn new(
        model_a: ModelStore,
        model_b: ModelStore,
        model_a_field: String,
        model_b_field: String,
        foreign_key: Option<String>,
        owning_side: Option<&str>,
    ) -> LinkResult<Self> {
        let a_owns = match owning_side {
            None => true,
            Some(name) if name == model_a.name() => true,
            Some(name) if name == model_b.name() => false,
            Some(name) => {
                return Err(LinkError::config(format!(
                    "owning side `{name}` is neither `{}` nor `{}`",
                    model_a.name(),
                    model_b.name()
                )));
            }
        };
        let (owning, referenced, owning_side_field, ref_side_field) = if a_owns {
            (model_a, model_b, model_a_field, model_b_field)
        } else {
            (model_b, model_a, model_b_field, model_a_field)
        };
        let foreign_key = foreign_key.unwrap_or_else(|| format!("{owning_side_field}Id"));
        Ok(Self {
            owning,
            referenced,
            owning_side_field,
            ref_side_field,
            foreign_key,
        })
    }

    pub fn owning_side(&self) -> &str {
        self.owning.name()
    }

    pub fn ref_side(&self) -> &str {
        self.referenced.name()
    }

    pub fn owning_side_field(&self) -> &str {
        &self.owning_side_field
    }

    pub fn ref_side_field(&self) -> &str {
        &self.ref_side_field
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    // owning side

    pub async fn set_foreign_key_on_owning_side(
        &self,
        ref_id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        self.referenced.require(ref_id, ctx).await?;
        Ok(key_fragment(&self.foreign_key, ref_id.clone()))
    }

    pub async fn create_and_set_foreign_key_on_owning_side(
        &self,
        data: Record,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        let created = self.referenced.create(data, ctx).await?;
        let id = record_id(&created, self.referenced.id_field())?;
        Ok(key_fragment(&self.foreign_key, id))
    }

    pub fn unset_foreign_key_on_owning_side(&self) -> Record {
        key_fragment(&self.foreign_key, Value::Null)
    }

    pub async fn delete_and_unset_foreign_key_on_owning_side(
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
        Ok(self.unset_foreign_key_on_owning_side())
    }

    // ref side: the ref record already exists when these run

    pub async fn connect_on_ref_side(
        &self,
        ref_id: &Id,
        owning_id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        self.owning.require(owning_id, ctx).await?;
        self.owning
            .update_by_id(owning_id, key_fragment(&self.foreign_key, ref_id.clone()), ctx)
            .await
    }

    pub async fn create_and_connect_on_ref_side(
        &self,
        ref_id: &Id,
        mut data: Record,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        data.insert(self.foreign_key.clone(), ref_id.clone());
        self.owning.create(data, ctx).await
    }

    pub async fn disconnect_on_ref_side(
        &self,
        ref_id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        let owner = self.require_owner(ref_id, ctx).await?;
        self.owning
            .update_by_id(&owner, self.unset_foreign_key_on_owning_side(), ctx)
            .await
    }

    pub async fn delete_and_disconnect_on_ref_side(
        &self,
        ref_id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        let owner = self.require_owner(ref_id, ctx).await?;
        self.owning.delete_by_id(&owner, ctx).await
    }

    // joins

    pub async fn join_on_owning_side(
        &self,
        parent: &Record,
        ctx: &RequestContext,
    ) -> LinkResult<Option<Record>> {
        match optional_key(parent, &self.foreign_key) {
            Some(ref_id) => self.referenced.find(&self.referenced.by_id(ref_id), ctx).await,
            None => Ok(None),
        }
    }

    pub async fn join_on_ref_side(
        &self,
        parent: &Record,
        ctx: &RequestContext,
    ) -> LinkResult<Option<Record>> {
        let id = record_id(parent, self.referenced.id_field())?;
        self.owning
            .find(&Filter::eq(self.foreign_key.clone(), id), ctx)
            .await
    }

    async fn require_owner(&self, ref_id: &Id, ctx: &RequestContext) -> LinkResult<Id> {
        let owner = self
            .owning
            .find(&Filter::eq(self.foreign_key.clone(), ref_id.clone()), ctx)
            .await?
            .ok_or_else(|| {
                LinkError::not_found(format!(
                    "{} {} is not linked to any {}",
                    self.referenced.name(),
                    display_id(ref_id),
                    self.owning.name()
                ))
            })?;
        record_id(&owner, self.owning.id_field())
    }
}

/// The key-holding side of a [`BiOneToOneRelation`].
#[derive(Debug, Clone)]
pub struct OwningSide(pub Arc<BiOneToOneRelation>);

/// The referenced side of a [`BiOneToOneRelation`].
#[derive(Debug, Clone)]
pub struct RefSide(pub Arc<BiOneToOneRelation>);

#[async_trait]
impl KeyHolderSide for OwningSide {
    async fn connect_fragment(&self, id: &Id, ctx: &RequestContext) -> LinkResult<Record> {
        self.0.set_foreign_key_on_owning_side(id, ctx).await
    }

    async fn create_fragment(&self, data: Record, ctx: &RequestContext) -> LinkResult<Record> {
        self.0
            .create_and_set_foreign_key_on_owning_side(data, ctx)
            .await
    }

    fn disconnect_fragment(&self) -> Record {
        self.0.unset_foreign_key_on_owning_side()
    }

    async fn delete_fragment(&self, holder_id: &Id, ctx: &RequestContext) -> LinkResult<Record> {
        self.0
            .delete_and_unset_foreign_key_on_owning_side(holder_id, ctx)
            .await
    }

    async fn resolve(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Option<Record>> {
        self.0.join_on_owning_side(parent, ctx).await
    }
}

#[async_trait]
impl ToOneLinkSide for RefSide {
    async fn connect(&self, own_id: &Id, other_id: &Id, ctx: &RequestContext) -> LinkResult<()> {
        self.0.connect_on_ref_side(own_id, other_id, ctx).await?;
        Ok(())
    }

    async fn create(&self, own_id: &Id, data: Record, ctx: &RequestContext) -> LinkResult<()> {
        self.0.create_and_connect_on_ref_side(own_id, data, ctx).await?;
        Ok(())
    }

    async fn disconnect(&self, own_id: &Id, ctx: &RequestContext) -> LinkResult<()> {
        self.0.disconnect_on_ref_side(own_id, ctx).await?;
        Ok(())
    }

    async fn delete(&self, own_id: &Id, ctx: &RequestContext) -> LinkResult<()> {
        self.0.delete_and_disconnect_on_ref_side(own_id, ctx).await?;
        Ok(())
    }

    async fn resolve(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Option<Record>> {
        self.0.join_on_ref_side(parent, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MemoryDataSource;

    fn store(name: &str) -> ModelStore {
        ModelStore::new(name, "id", Arc::new(MemoryDataSource::new(name)))
    }

    #[test]
    fn owning_side_selection() {
        let relation = BiOneToOneRelation::new(
            store("User"),
            store("Profile"),
            "profile".into(),
            "user".into(),
            None,
            Some("Profile"),
        )
        .unwrap();
        assert_eq!(relation.owning_side(), "Profile");
        assert_eq!(relation.ref_side(), "User");
        assert_eq!(relation.owning_side_field(), "user");
        assert_eq!(relation.ref_side_field(), "profile");
        assert_eq!(relation.foreign_key(), "userId");

        let default = BiOneToOneRelation::new(
            store("User"),
            store("Profile"),
            "profile".into(),
            "user".into(),
            Some("profile_ref".into()),
            None,
        )
        .unwrap();
        assert_eq!(default.owning_side(), "User");
        assert_eq!(default.foreign_key(), "profile_ref");
    }

    #[test]
    fn unknown_owning_side() {
        let err = BiOneToOneRelation::new(
            store("User"),
            store("Profile"),
            "profile".into(),
            "user".into(),
            None,
            Some("Account"),
        )
        .unwrap_err();
        assert!(matches!(err, LinkError::Config(_)));
    }
}
