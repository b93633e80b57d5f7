use super::{InputNames, SchemaRoot, block, field_type_prefix, input_fields};
use crate::context::CreateContext;
use crate::datasource::ModelStore;
use crate::error::{LinkError, LinkResult};
use crate::hooks::{CreateOperation, ModelHooks};
use crate::model::Model;
use crate::record::Record;
use crate::relation::{Cardinality, RelationField};
use async_trait::async_trait;
use std::sync::Arc;

/// The base create: one storage write with whatever data the hooks left behind.
pub struct StoreCreate<'a> {
    store: &'a ModelStore,
}

impl<'a> StoreCreate<'a> {
    pub fn new(store: &'a ModelStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CreateOperation for StoreCreate<'_> {
    async fn execute(&self, mut ctx: CreateContext) -> LinkResult<CreateContext> {
        let created = self.store.create(ctx.data.clone(), &ctx.request).await?;
        ctx.response = Some(created);
        Ok(ctx)
    }
}

/// `create<Model>` mutations.
#[derive(Clone)]
pub struct CreatePlugin {
    names: Arc<dyn InputNames>,
}

impl CreatePlugin {
    pub fn new(names: Arc<dyn InputNames>) -> Self {
        Self { names }
    }

    pub fn mutation_name(&self, model: &Model) -> String {
        format!("create{}", model.capital_name())
    }

    /// Register `<Model>CreateInput`, its relation inputs and the mutation field.
    pub fn visit_model(&self, model: &Model, relations: &[RelationField], root: &mut dyn SchemaRoot) {
        let input_name = self.names.create_input(model.name());
        let mut lines = input_fields(&model.capital_name(), model.fields(), false, root);
        for relation in relations {
            let name = self.relation_input(model, relation, root);
            lines.push(format!("{}: {name}", relation.field));
        }
        root.add_input(block("input", &input_name, &lines));
        root.add_mutation(format!(
            "{}(data: {input_name}!): {}",
            self.mutation_name(model),
            model.capital_name()
        ));
    }

    /// `<Model><Field>CreateOneInput { connect, create }` or the `Many` list form.
    fn relation_input(&self, model: &Model, relation: &RelationField, root: &mut dyn SchemaRoot) -> String {
        let where_unique = self.names.where_unique_input(&relation.target);
        let create = self.names.create_input(&relation.target);
        let prefix = field_type_prefix(model.name(), &relation.field);
        let (name, lines) = match relation.cardinality {
            Cardinality::One => (
                format!("{prefix}CreateOneInput"),
                vec![format!("connect: {where_unique}"), format!("create: {create}")],
            ),
            Cardinality::Many => (
                format!("{prefix}CreateManyInput"),
                vec![
                    format!("connect: [{where_unique}!]"),
                    format!("create: [{create}!]"),
                ],
            ),
        };
        root.add_input(block("input", &name, &lines));
        name
    }

    /// Run the base create of `store` wrapped by the model's hooks.
    pub async fn execute(
        &self,
        store: &ModelStore,
        hooks: Option<&ModelHooks>,
        ctx: CreateContext,
    ) -> LinkResult<Record> {
        let base = StoreCreate::new(store);
        let ctx = match hooks {
            Some(hooks) => hooks.wrap_create(ctx, &base).await?,
            None => base.execute(ctx).await?,
        };
        ctx.response.ok_or_else(|| {
            LinkError::Other(format!("create{} produced no record", store.name()))
        })
    }
}
