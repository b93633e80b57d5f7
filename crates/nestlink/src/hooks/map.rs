use super::{CreateChain, CreateOperation, RelationHook, UpdateChain, UpdateOperation};
use crate::context::{CreateContext, RequestContext, UpdateContext};
use crate::error::{LinkError, LinkResult};
use crate::record::Record;
use crate::relation::Cardinality;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Every hook contributed to one model, in declaration order.
#[derive(Clone, Default)]
pub struct ModelHooks {
    hooks: Vec<Arc<dyn RelationHook>>,
}

impl fmt::Debug for ModelHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHooks")
            .field("fields", &self.fields())
            .finish()
    }
}

impl ModelHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook. Two hooks for the same field are a configuration error.
    pub fn push(&mut self, hook: Arc<dyn RelationHook>) -> LinkResult<()> {
        if self.get(hook.field()).is_some() {
            return Err(LinkError::config(format!(
                "relation field `{}.{}` is declared twice",
                hook.model(),
                hook.field()
            )));
        }
        self.hooks.push(hook);
        Ok(())
    }

    pub fn get(&self, field: &str) -> Option<&Arc<dyn RelationHook>> {
        self.hooks.iter().find(|hook| hook.field() == field)
    }

    pub fn fields(&self) -> Vec<&str> {
        self.hooks.iter().map(|hook| hook.field()).collect()
    }

    /// `(field, cardinality)` of every relation field, for payload splitting.
    pub fn relation_fields(&self) -> impl Iterator<Item = (&str, Cardinality)> {
        self.hooks
            .iter()
            .map(|hook| (hook.field(), hook.cardinality()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn RelationHook>> {
        self.hooks.iter()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run `base` wrapped by every hook. The first declared hook is outermost.
    pub async fn wrap_create(
        &self,
        ctx: CreateContext,
        base: &dyn CreateOperation,
    ) -> LinkResult<CreateContext> {
        CreateChain {
            hooks: &self.hooks,
            base,
        }
        .execute(ctx)
        .await
    }

    pub async fn wrap_update(
        &self,
        ctx: UpdateContext,
        base: &dyn UpdateOperation,
    ) -> LinkResult<UpdateContext> {
        UpdateChain {
            hooks: &self.hooks,
            base,
        }
        .execute(ctx)
        .await
    }

    /// `None` when `field` has no hook on this model.
    pub async fn resolve(
        &self,
        field: &str,
        parent: &Record,
        ctx: &RequestContext,
    ) -> Option<LinkResult<Value>> {
        match self.get(field) {
            Some(hook) => Some(hook.resolve(parent, ctx).await),
            None => None,
        }
    }
}

/// Hooks keyed by model name.
#[derive(Debug, Clone, Default)]
pub struct HookMap {
    models: BTreeMap<String, ModelHooks>,
}

impl HookMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hook: Arc<dyn RelationHook>) -> LinkResult<()> {
        self.models
            .entry(hook.model().to_string())
            .or_default()
            .push(hook)
    }

    /// Append every hook of `other`, keeping declaration order per model.
    pub fn merge(&mut self, other: HookMap) -> LinkResult<()> {
        for (_, hooks) in other.models {
            for hook in hooks.hooks {
                self.insert(hook)?;
            }
        }
        Ok(())
    }

    pub fn get(&self, model: &str) -> Option<&ModelHooks> {
        self.models.get(model)
    }

    pub fn hook(&self, model: &str, field: &str) -> Option<&Arc<dyn RelationHook>> {
        self.get(model)?.get(field)
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::RelationField;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the order in which hooks wrap the base write.
    struct Tracer {
        field: RelationField,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Tracer {
        fn new(model: &str, field: &str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn RelationHook> {
            Arc::new(Self {
                field: RelationField {
                    model: model.into(),
                    field: field.into(),
                    target: "Other".into(),
                    cardinality: Cardinality::One,
                },
                log: log.clone(),
            })
        }
    }

    #[async_trait]
    impl RelationHook for Tracer {
        fn relation_field(&self) -> &RelationField {
            &self.field
        }

        async fn wrap_create(
            &self,
            ctx: CreateContext,
            next: &dyn CreateOperation,
        ) -> LinkResult<CreateContext> {
            self.log.lock().unwrap().push(format!("enter {}", self.field.field));
            let ctx = next.execute(ctx).await?;
            self.log.lock().unwrap().push(format!("leave {}", self.field.field));
            Ok(ctx)
        }

        async fn resolve(&self, _parent: &Record, _ctx: &RequestContext) -> LinkResult<Value> {
            Ok(Value::Null)
        }
    }

    struct Base(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl CreateOperation for Base {
        async fn execute(&self, mut ctx: CreateContext) -> LinkResult<CreateContext> {
            self.0.lock().unwrap().push("base".into());
            ctx.response = Some(ctx.data.clone());
            Ok(ctx)
        }
    }

    #[tokio::test]
    async fn chains_in_declaration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut map = HookMap::new();
        map.insert(Tracer::new("Author", "books", &log)).unwrap();

        let mut other = HookMap::new();
        other.insert(Tracer::new("Author", "avatar", &log)).unwrap();
        other.insert(Tracer::new("Book", "author", &log)).unwrap();
        map.merge(other).unwrap();

        let hooks = map.get("Author").unwrap();
        assert_eq!(hooks.fields(), vec!["books", "avatar"]);

        let ctx = CreateContext::new(Record::new(), RequestContext::new());
        let ctx = hooks.wrap_create(ctx, &Base(log.clone())).await.unwrap();
        assert!(ctx.response.is_some());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["enter books", "enter avatar", "base", "leave avatar", "leave books"]
        );
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut map = HookMap::new();
        map.insert(Tracer::new("Author", "books", &log)).unwrap();
        let err = map.insert(Tracer::new("Author", "books", &log)).unwrap_err();
        assert!(matches!(err, LinkError::Config(_)));
    }
}
