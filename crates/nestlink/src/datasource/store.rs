use super::DataSource;
use crate::context::RequestContext;
use crate::error::{LinkError, LinkResult};
use crate::mutation::MutationFactory;
use crate::record::{Filter, Id, Record, display_id};
use std::fmt;
use std::sync::Arc;

/// A model's data source paired with its payload conversion rules.
///
/// Relation implementations write to both participants through stores, so
/// nested `create` payloads get the same list-field handling as top-level ones.
#[derive(Clone)]
pub struct ModelStore {
    name: String,
    id_field: String,
    data_source: Arc<dyn DataSource>,
    factory: Arc<MutationFactory>,
}

impl fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelStore")
            .field("name", &self.name)
            .field("id_field", &self.id_field)
            .finish_non_exhaustive()
    }
}

impl ModelStore {
    pub fn new(
        name: impl Into<String>,
        id_field: impl Into<String>,
        data_source: Arc<dyn DataSource>,
    ) -> Self {
        Self {
            name: name.into(),
            id_field: id_field.into(),
            data_source,
            factory: Arc::new(MutationFactory::new()),
        }
    }

    pub fn with_factory(mut self, factory: MutationFactory) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn data_source(&self) -> &Arc<dyn DataSource> {
        &self.data_source
    }

    /// Filter selecting the record with `id`.
    pub fn by_id(&self, id: &Id) -> Filter {
        Filter::eq(self.id_field.clone(), id.clone())
    }

    pub async fn find(&self, filter: &Filter, ctx: &RequestContext) -> LinkResult<Option<Record>> {
        self.data_source.find(filter, ctx).await
    }

    pub async fn find_many(&self, filter: &Filter, ctx: &RequestContext) -> LinkResult<Vec<Record>> {
        self.data_source.find_many(filter, ctx).await
    }

    /// Fetch the record with `id`, failing with `NotFound` when it does not exist.
    pub async fn require(&self, id: &Id, ctx: &RequestContext) -> LinkResult<Record> {
        self.data_source
            .find(&self.by_id(id), ctx)
            .await?
            .ok_or_else(|| {
                LinkError::not_found(format!("{} {} does not exist", self.name, display_id(id)))
            })
    }

    pub async fn create(&self, payload: Record, ctx: &RequestContext) -> LinkResult<Record> {
        let mutation = self.factory.create_mutation(payload)?;
        self.data_source.create(mutation, ctx).await
    }

    pub async fn update(
        &self,
        filter: &Filter,
        payload: Record,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        let mutation = self.factory.update_mutation(payload)?;
        self.data_source.update(filter, mutation, ctx).await
    }

    pub async fn update_by_id(
        &self,
        id: &Id,
        payload: Record,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        self.update(&self.by_id(id), payload, ctx).await
    }

    pub async fn delete(&self, filter: &Filter, ctx: &RequestContext) -> LinkResult<Record> {
        self.data_source.delete(filter, ctx).await
    }

    pub async fn delete_by_id(&self, id: &Id, ctx: &RequestContext) -> LinkResult<Record> {
        self.delete(&self.by_id(id), ctx).await
    }
}
