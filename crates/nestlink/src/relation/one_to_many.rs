use super::{KeyHolderSide, ToManyLinkSide, key_fragment};
use crate::context::RequestContext;
use crate::datasource::ModelStore;
use crate::error::{LinkError, LinkResult};
use crate::record::{Filter, Id, Record, display_id, optional_key, record_id};
use async_trait::async_trait;
use heck::ToLowerCamelCase;
use serde_json::Value;
use std::sync::Arc;

/// One record on the one side, many on the many side; the many side stores the key.
#[derive(Debug)]
pub struct OneToManyRelation {
    one: ModelStore,
    many: ModelStore,
    one_side_field: String,
    many_side_field: Option<String>,
    foreign_key: String,
}

impl OneToManyRelation {
    /// The key defaults to `<manySideField>Id`, or `<oneModel>Id` when the many side has no field.
    pub fn new(
        one: ModelStore,
        many: ModelStore,
        one_side_field: String,
        many_side_field: Option<String>,
        foreign_key: Option<String>,
    ) -> Self {
        let foreign_key = foreign_key.unwrap_or_else(|| match &many_side_field {
            Some(field) => format!("{field}Id"),
            None => format!("{}Id", one.name().to_lower_camel_case()),
        });
        Self {
            one,
            many,
            one_side_field,
            many_side_field,
            foreign_key,
        }
    }

    pub fn one_side_model(&self) -> &str {
        self.one.name()
    }

    pub fn many_side_model(&self) -> &str {
        self.many.name()
    }

    pub fn one_side_field(&self) -> &str {
        &self.one_side_field
    }

    pub fn many_side_field(&self) -> Option<&str> {
        self.many_side_field.as_deref()
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    // many side

    pub async fn set_foreign_key_on_many_side(
        &self,
        connect_id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        self.one.require(connect_id, ctx).await?;
        Ok(key_fragment(&self.foreign_key, connect_id.clone()))
    }

    pub async fn create_and_set_foreign_key_on_many_side(
        &self,
        data: Record,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        let created = self.one.create(data, ctx).await?;
        let id = record_id(&created, self.one.id_field())?;
        Ok(key_fragment(&self.foreign_key, id))
    }

    pub fn unset_foreign_key_on_many_side(&self) -> Record {
        key_fragment(&self.foreign_key, Value::Null)
    }

    /// Delete the one-side record `many_id` currently points at.
    pub async fn destroy_and_unset_foreign_key_on_many_side(
        &self,
        many_id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        let holder = self.many.require(many_id, ctx).await?;
        let Some(one_id) = optional_key(&holder, &self.foreign_key) else {
            return Err(LinkError::not_found(format!(
                "{} {} has no {} to delete",
                self.many.name(),
                display_id(many_id),
                self.one.name()
            )));
        };
        self.one.delete_by_id(one_id, ctx).await?;
        Ok(self.unset_foreign_key_on_many_side())
    }

    // one side

    pub async fn create_and_add_from_one_side(
        &self,
        source_id: &Id,
        mut record: Record,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        record.insert(self.foreign_key.clone(), source_id.clone());
        self.many.create(record, ctx).await
    }

    pub async fn add_id_from_one_side(
        &self,
        source_id: &Id,
        id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        self.many.require(id, ctx).await?;
        self.many
            .update_by_id(id, key_fragment(&self.foreign_key, source_id.clone()), ctx)
            .await
    }

    pub async fn remove_id_from_one_side(
        &self,
        source_id: &Id,
        id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        let linked = self.linked(source_id, id);
        self.require_linked(&linked, source_id, id, ctx).await?;
        self.many
            .update(&linked, self.unset_foreign_key_on_many_side(), ctx)
            .await
    }

    pub async fn delete_id_from_one_side(
        &self,
        source_id: &Id,
        id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        let linked = self.linked(source_id, id);
        self.require_linked(&linked, source_id, id, ctx).await?;
        self.many.delete(&linked, ctx).await
    }

    // joins

    pub async fn join_many_on_one_side(
        &self,
        parent: &Record,
        ctx: &RequestContext,
    ) -> LinkResult<Vec<Record>> {
        let id = record_id(parent, self.one.id_field())?;
        self.many
            .find_many(&Filter::eq(self.foreign_key.clone(), id), ctx)
            .await
    }

    pub async fn join_one_on_many_side(
        &self,
        parent: &Record,
        ctx: &RequestContext,
    ) -> LinkResult<Option<Record>> {
        match optional_key(parent, &self.foreign_key) {
            Some(one_id) => self.one.find(&self.one.by_id(one_id), ctx).await,
            None => Ok(None),
        }
    }

    fn linked(&self, source_id: &Id, id: &Id) -> Filter {
        self.many
            .by_id(id)
            .and_eq(self.foreign_key.clone(), source_id.clone())
    }

    async fn require_linked(
        &self,
        linked: &Filter,
        source_id: &Id,
        id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<()> {
        match self.many.find(linked, ctx).await? {
            Some(_) => Ok(()),
            None => Err(LinkError::not_found(format!(
                "{} {} is not linked to {} {}",
                self.many.name(),
                display_id(id),
                self.one.name(),
                display_id(source_id)
            ))),
        }
    }
}

/// The one side of a [`OneToManyRelation`].
#[derive(Debug, Clone)]
pub struct OneSide(pub Arc<OneToManyRelation>);

/// The many side of a [`OneToManyRelation`].
#[derive(Debug, Clone)]
pub struct ManySide(pub Arc<OneToManyRelation>);

#[async_trait]
impl ToManyLinkSide for OneSide {
    async fn connect(&self, own_id: &Id, other_id: &Id, ctx: &RequestContext) -> LinkResult<()> {
        self.0.add_id_from_one_side(own_id, other_id, ctx).await?;
        Ok(())
    }

    async fn create(&self, own_id: &Id, data: Record, ctx: &RequestContext) -> LinkResult<()> {
        self.0.create_and_add_from_one_side(own_id, data, ctx).await?;
        Ok(())
    }

    async fn disconnect(
        &self,
        own_id: &Id,
        other_id: &Id,
        ctx: &RequestContext,
    ) -> LinkResult<()> {
        self.0.remove_id_from_one_side(own_id, other_id, ctx).await?;
        Ok(())
    }

    async fn delete(&self, own_id: &Id, other_id: &Id, ctx: &RequestContext) -> LinkResult<()> {
        self.0.delete_id_from_one_side(own_id, other_id, ctx).await?;
        Ok(())
    }

    async fn resolve(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Vec<Record>> {
        self.0.join_many_on_one_side(parent, ctx).await
    }
}

#[async_trait]
impl KeyHolderSide for ManySide {
    async fn connect_fragment(&self, id: &Id, ctx: &RequestContext) -> LinkResult<Record> {
        self.0.set_foreign_key_on_many_side(id, ctx).await
    }

    async fn create_fragment(&self, data: Record, ctx: &RequestContext) -> LinkResult<Record> {
        self.0.create_and_set_foreign_key_on_many_side(data, ctx).await
    }

    fn disconnect_fragment(&self) -> Record {
        self.0.unset_foreign_key_on_many_side()
    }

    async fn delete_fragment(&self, holder_id: &Id, ctx: &RequestContext) -> LinkResult<Record> {
        self.0
            .destroy_and_unset_foreign_key_on_many_side(holder_id, ctx)
            .await
    }

    async fn resolve(&self, parent: &Record, ctx: &RequestContext) -> LinkResult<Option<Record>> {
        self.0.join_one_on_many_side(parent, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MemoryDataSource;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn relation(authors: Vec<Record>, books: Vec<Record>) -> OneToManyRelation {
        let authors = MemoryDataSource::new("Author").with_records(authors);
        let books = MemoryDataSource::new("Book").with_records(books);
        OneToManyRelation::new(
            ModelStore::new("Author", "id", Arc::new(authors)),
            ModelStore::new("Book", "id", Arc::new(books)),
            "books".into(),
            Some("author".into()),
            None,
        )
    }

    #[test]
    fn default_foreign_key() {
        assert_eq!(relation(vec![], vec![]).foreign_key(), "authorId");

        let uni = OneToManyRelation::new(
            ModelStore::new("Author", "id", Arc::new(MemoryDataSource::new("Author"))),
            ModelStore::new("Book", "id", Arc::new(MemoryDataSource::new("Book"))),
            "books".into(),
            None,
            None,
        );
        assert_eq!(uni.foreign_key(), "authorId");
        assert_eq!(uni.many_side_field(), None);
    }

    #[tokio::test]
    async fn connect_requires_existing_one_side() {
        let relation = relation(vec![record(json!({"id": "a1"}))], vec![]);
        let ctx = RequestContext::new();

        let fragment = relation
            .set_foreign_key_on_many_side(&json!("a1"), &ctx)
            .await
            .unwrap();
        assert_eq!(fragment, record(json!({"authorId": "a1"})));

        let err = relation
            .set_foreign_key_on_many_side(&json!("missing"), &ctx)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn remove_requires_link() {
        let relation = relation(
            vec![record(json!({"id": "a1"})), record(json!({"id": "a2"}))],
            vec![record(json!({"id": "b1", "authorId": "a2"}))],
        );
        let ctx = RequestContext::new();

        let err = relation
            .remove_id_from_one_side(&json!("a1"), &json!("b1"), &ctx)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let book = relation
            .remove_id_from_one_side(&json!("a2"), &json!("b1"), &ctx)
            .await
            .unwrap();
        assert_eq!(book["authorId"], Value::Null);
    }

    #[tokio::test]
    async fn join_one_on_many_side_with_null_key() {
        let relation = relation(vec![record(json!({"id": "a1"}))], vec![]);
        let ctx = RequestContext::new();

        let orphan = record(json!({"id": "b1", "authorId": null}));
        assert_eq!(relation.join_one_on_many_side(&orphan, &ctx).await.unwrap(), None);

        let linked = record(json!({"id": "b2", "authorId": "a1"}));
        let author = relation.join_one_on_many_side(&linked, &ctx).await.unwrap();
        assert_eq!(author, Some(record(json!({"id": "a1"}))));
    }
}
