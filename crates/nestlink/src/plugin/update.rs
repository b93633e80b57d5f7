use super::{InputNames, SchemaRoot, block, field_type_prefix, input_fields};
use crate::context::UpdateContext;
use crate::datasource::ModelStore;
use crate::error::{LinkError, LinkResult};
use crate::hooks::{ModelHooks, UpdateOperation};
use crate::model::Model;
use crate::record::Record;
use crate::relation::{Cardinality, RelationField};
use async_trait::async_trait;
use std::sync::Arc;

/// The base update of the record selected by the context's filter.
pub struct StoreUpdate<'a> {
    store: &'a ModelStore,
}

impl<'a> StoreUpdate<'a> {
    pub fn new(store: &'a ModelStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UpdateOperation for StoreUpdate<'_> {
    async fn execute(&self, mut ctx: UpdateContext) -> LinkResult<UpdateContext> {
        let updated = self
            .store
            .update(&ctx.filter, ctx.data.clone(), &ctx.request)
            .await?;
        ctx.response = Some(updated);
        Ok(ctx)
    }
}

/// `update<Model>` mutations.
#[derive(Clone)]
pub struct UpdatePlugin {
    names: Arc<dyn InputNames>,
}

impl UpdatePlugin {
    pub fn new(names: Arc<dyn InputNames>) -> Self {
        Self { names }
    }

    pub fn mutation_name(&self, model: &Model) -> String {
        format!("update{}", model.capital_name())
    }

    pub fn visit_model(&self, model: &Model, relations: &[RelationField], root: &mut dyn SchemaRoot) {
        let input_name = self.names.update_input(model.name());
        let where_unique = self.names.where_unique_input(model.name());
        let mut lines = input_fields(&model.capital_name(), model.fields(), true, root);
        for relation in relations {
            let name = self.relation_input(model, relation, root);
            lines.push(format!("{}: {name}", relation.field));
        }
        root.add_input(block("input", &input_name, &lines));
        root.add_mutation(format!(
            "{}(where: {where_unique}!, data: {input_name}!): {}",
            self.mutation_name(model),
            model.capital_name()
        ));
    }

    /// To-one fields take boolean `disconnect`/`delete`; to-many fields take lists of unique wheres.
    fn relation_input(&self, model: &Model, relation: &RelationField, root: &mut dyn SchemaRoot) -> String {
        let where_unique = self.names.where_unique_input(&relation.target);
        let create = self.names.create_input(&relation.target);
        let prefix = field_type_prefix(model.name(), &relation.field);
        let (name, lines) = match relation.cardinality {
            Cardinality::One => (
                format!("{prefix}UpdateOneInput"),
                vec![
                    format!("connect: {where_unique}"),
                    format!("create: {create}"),
                    "disconnect: Boolean".to_string(),
                    "delete: Boolean".to_string(),
                ],
            ),
            Cardinality::Many => (
                format!("{prefix}UpdateManyInput"),
                vec![
                    format!("connect: [{where_unique}!]"),
                    format!("create: [{create}!]"),
                    format!("disconnect: [{where_unique}!]"),
                    format!("delete: [{where_unique}!]"),
                ],
            ),
        };
        root.add_input(block("input", &name, &lines));
        name
    }

    pub async fn execute(
        &self,
        store: &ModelStore,
        hooks: Option<&ModelHooks>,
        ctx: UpdateContext,
    ) -> LinkResult<Record> {
        let base = StoreUpdate::new(store);
        let ctx = match hooks {
            Some(hooks) => hooks.wrap_update(ctx, &base).await?,
            None => base.execute(ctx).await?,
        };
        ctx.response
            .ok_or_else(|| LinkError::Other(format!("update{} produced no record", store.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{DefaultInputNames, SdlRoot};
    use crate::model::Field;

    #[test]
    fn update_input_with_to_one_relation() {
        let book = Model::new("Book").field(Field::scalar("title", "String"));
        let relations = vec![RelationField {
            model: "Book".into(),
            field: "author".into(),
            target: "Author".into(),
            cardinality: Cardinality::One,
        }];
        let plugin = UpdatePlugin::new(Arc::new(DefaultInputNames));
        let mut root = SdlRoot::new();
        plugin.visit_model(&book, &relations, &mut root);

        assert_eq!(
            root.inputs()[0],
            "input BookAuthorUpdateOneInput {\n  connect: AuthorWhereUniqueInput\n  create: AuthorCreateInput\n  disconnect: Boolean\n  delete: Boolean\n}"
        );
        assert_eq!(
            root.mutations(),
            ["updateBook(where: BookWhereUniqueInput!, data: BookUpdateInput!): Book"]
        );
    }
}
