//! The assembled relation engine: models, data sources, relations and hooks.

use crate::config::EngineConfig;
use crate::context::{CreateContext, RequestContext, UpdateContext};
use crate::datasource::{DataSource, ModelStore};
use crate::error::{LinkError, LinkResult};
use crate::hooks::{
    HookMap, ModelHooks, PayloadMode, RelationPayload, build_hook_map, split_relations,
};
use crate::model::Model;
use crate::mutation::MutationFactory;
use crate::plugin::{
    CreatePlugin, DefaultInputNames, InputNames, SchemaRoot, SdlRoot, UpdatePlugin,
    emit_object_type, emit_where_unique,
};
use crate::record::{Filter, Record};
use crate::relation::{ModelRelation, Relation, RelationField};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Builder for [`RelationEngine`].
pub struct RelationEngineBuilder {
    config: EngineConfig,
    names: Arc<dyn InputNames>,
    models: Vec<(Model, Arc<dyn DataSource>)>,
    join_tables: Vec<(String, Arc<dyn DataSource>)>,
    relations: Vec<ModelRelation>,
}

impl Default for RelationEngineBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            names: Arc::new(DefaultInputNames),
            models: Vec::new(),
            join_tables: Vec::new(),
            relations: Vec::new(),
        }
    }
}

impl RelationEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the naming of per-model input types.
    pub fn input_names(mut self, names: Arc<dyn InputNames>) -> Self {
        self.names = names;
        self
    }

    /// Register a model and the data source storing its records.
    pub fn model(mut self, model: Model, data_source: Arc<dyn DataSource>) -> Self {
        self.models.push((model, data_source));
        self
    }

    /// Register the data source holding many-to-many membership rows.
    pub fn join_table(mut self, name: impl Into<String>, data_source: Arc<dyn DataSource>) -> Self {
        self.join_tables.push((name.into(), data_source));
        self
    }

    pub fn relation(mut self, relation: ModelRelation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn build(self) -> LinkResult<RelationEngine> {
        self.config.validate()?;
        let id_field = self.config.id_field.clone();

        let mut stores = BTreeMap::new();
        let mut models = Vec::with_capacity(self.models.len());
        for (model, data_source) in self.models {
            let mut factory = MutationFactory::new();
            for field in model.fields().iter().filter(|f| f.list) {
                factory.mark_array_field(field.name.clone());
            }
            let store = ModelStore::new(model.name(), id_field.clone(), data_source)
                .with_factory(factory);
            if stores.insert(model.name().to_string(), store).is_some() {
                return Err(LinkError::config(format!(
                    "model `{}` is registered twice",
                    model.name()
                )));
            }
            models.push(model);
        }
        for (name, data_source) in self.join_tables {
            let store = ModelStore::new(name.clone(), id_field.clone(), data_source);
            if stores.insert(name.clone(), store).is_some() {
                return Err(LinkError::config(format!(
                    "join table `{name}` clashes with another data source"
                )));
            }
        }

        let mut relations = Vec::with_capacity(self.relations.len());
        let mut hooks = HookMap::new();
        for descriptor in &self.relations {
            for name in [&descriptor.source, &descriptor.target] {
                if !models.iter().any(|m| m.name() == name.as_str()) {
                    return Err(LinkError::config(format!(
                        "relation `{}.{}` refers to unknown model `{name}`",
                        descriptor.source, descriptor.source_field
                    )));
                }
            }
            let relation = Relation::new(descriptor, &stores)?;
            for field in relation.fields() {
                let clashes = models
                    .iter()
                    .filter(|m| m.name() == field.model)
                    .any(|m| m.fields().iter().any(|f| f.name == field.field));
                if clashes {
                    return Err(LinkError::config(format!(
                        "relation field `{}.{}` shadows a stored field",
                        field.model, field.field
                    )));
                }
            }
            hooks.merge(build_hook_map(&relation, &self.config)?)?;
            tracing::debug!(
                target: "nestlink.engine",
                kind = relation.kind().as_str(),
                source = %descriptor.source,
                target_model = %descriptor.target,
                foreign_key = relation.foreign_key().unwrap_or("-"),
                "relation registered"
            );
            relations.push(relation);
        }

        Ok(RelationEngine {
            create: CreatePlugin::new(self.names.clone()),
            update: UpdatePlugin::new(self.names.clone()),
            config: self.config,
            names: self.names,
            models,
            stores,
            relations,
            hooks,
        })
    }
}

/// Runs nested create/update mutations and relation field resolvers.
pub struct RelationEngine {
    config: EngineConfig,
    names: Arc<dyn InputNames>,
    models: Vec<Model>,
    stores: BTreeMap<String, ModelStore>,
    relations: Vec<Relation>,
    hooks: HookMap,
    create: CreatePlugin,
    update: UpdatePlugin,
}

impl fmt::Debug for RelationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationEngine")
            .field("config", &self.config)
            .field("models", &self.models.iter().map(Model::name).collect::<Vec<_>>())
            .field("relations", &self.relations)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl RelationEngine {
    pub fn builder() -> RelationEngineBuilder {
        RelationEngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn hooks(&self) -> &HookMap {
        &self.hooks
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn store(&self, name: &str) -> Option<&ModelStore> {
        self.stores.get(name)
    }

    /// Relation fields declared on `model`, in declaration order.
    pub fn relation_fields(&self, model: &str) -> Vec<RelationField> {
        self.hooks
            .get(model)
            .map(|hooks| hooks.iter().map(|h| h.relation_field().clone()).collect())
            .unwrap_or_default()
    }

    fn model_store(&self, model: &str) -> LinkResult<&ModelStore> {
        if !self.models.iter().any(|m| m.name() == model) {
            return Err(LinkError::validation(format!("unknown model `{model}`")));
        }
        self.stores
            .get(model)
            .ok_or_else(|| LinkError::config(format!("no data source registered for `{model}`")))
    }

    /// `create<Model>(data)`.
    pub async fn create(
        &self,
        model: &str,
        data: Record,
        request: RequestContext,
    ) -> LinkResult<Record> {
        let store = self.model_store(model)?;
        let hooks = self.hooks.get(model);
        tracing::debug!(
            target: "nestlink.engine",
            model,
            request_id = request.request_id().unwrap_or("-"),
            "create"
        );

        let mut ctx = CreateContext::new(data, request);
        if let Some(hooks) = hooks {
            ctx.relations = self.split(hooks, &mut ctx.data, PayloadMode::Create)?;
        }
        self.create.execute(store, hooks, ctx).await
    }

    /// `update<Model>(where, data)`. `where` must carry the id field.
    pub async fn update(
        &self,
        model: &str,
        where_unique: Record,
        data: Record,
        request: RequestContext,
    ) -> LinkResult<Record> {
        let store = self.model_store(model)?;
        let hooks = self.hooks.get(model);
        let mut ctx = UpdateContext::new(Filter::from_record(where_unique), data, request);
        let id = ctx.target_id(&self.config.id_field)?;
        tracing::debug!(
            target: "nestlink.engine",
            model,
            id = %id,
            request_id = ctx.request.request_id().unwrap_or("-"),
            "update"
        );

        if let Some(hooks) = hooks {
            ctx.relations = self.split(hooks, &mut ctx.data, PayloadMode::Update)?;
        }
        self.update.execute(store, hooks, ctx).await
    }

    fn split(
        &self,
        hooks: &ModelHooks,
        data: &mut Record,
        mode: PayloadMode,
    ) -> LinkResult<BTreeMap<String, RelationPayload>> {
        let mut relations = split_relations(data, hooks.relation_fields(), mode, &self.config)?;
        for (field, payload) in relations.iter_mut() {
            let Some(hook) = hooks.get(field) else {
                continue;
            };
            let target = &hook.relation_field().target;
            for record in payload.creates_mut() {
                self.check_nested_create(target, field, record)?;
            }
        }
        Ok(relations)
    }

    /// Nested creates are written straight to the target store, so they may
    /// not carry the target's own relation fields. `null` ones are dropped.
    fn check_nested_create(&self, target: &str, field: &str, record: &mut Record) -> LinkResult<()> {
        let Some(target_hooks) = self.hooks.get(target) else {
            return Ok(());
        };
        for name in target_hooks.fields() {
            match record.get(name) {
                None => {}
                Some(Value::Null) => {
                    record.remove(name);
                }
                Some(_) => {
                    return Err(LinkError::validation(format!(
                        "`{field}.create` cannot nest relation field `{target}.{name}`"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolve relation field `model.field` for `parent`. Never writes.
    pub async fn resolve_field(
        &self,
        model: &str,
        field: &str,
        parent: &Record,
        request: &RequestContext,
    ) -> LinkResult<Value> {
        let hook = self.hooks.hook(model, field).ok_or_else(|| {
            LinkError::validation(format!("`{model}.{field}` is not a relation field"))
        })?;
        hook.resolve(parent, request).await
    }

    /// Register object types, unique-where inputs and create/update mutations of every model.
    pub fn emit_schema(&self, root: &mut dyn SchemaRoot) {
        for model in &self.models {
            let relations = self.relation_fields(model.name());
            emit_object_type(model, &relations, root);
            emit_where_unique(model, &self.config.id_field, self.names.as_ref(), root);
            self.create.visit_model(model, &relations, root);
            self.update.visit_model(model, &relations, root);
        }
    }

    /// [`emit_schema`](Self::emit_schema) rendered to SDL text.
    pub fn sdl(&self) -> String {
        let mut root = SdlRoot::new();
        self.emit_schema(&mut root);
        root.render()
    }
}
