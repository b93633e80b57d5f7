//! Per-request contexts passed through hooks.
//!
//! Contexts move by value: a hook receives a context, hands it to the next
//! operation, and gets back the context carrying the base operation's response.

use crate::error::{LinkError, LinkResult};
use crate::hooks::RelationPayload;
use crate::record::{Filter, Record};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Opaque request-scoped context threaded to every storage call.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    request_id: Option<String>,
    values: Arc<BTreeMap<String, Value>>,
}

impl RequestContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a request id (used in log lines).
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Attach an arbitrary value for data sources to consume.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Arc::make_mut(&mut self.values).insert(key.into(), value.into());
        self
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// Envelope of one `create<Model>` call.
#[derive(Debug, Clone)]
pub struct CreateContext {
    /// Scalar payload, already stripped of relation fields.
    pub data: Record,
    /// Relation sub-documents not yet consumed by a hook, keyed by field.
    pub relations: BTreeMap<String, RelationPayload>,
    /// Set by the base create operation.
    pub response: Option<Record>,
    pub request: RequestContext,
}

impl CreateContext {
    pub fn new(data: Record, request: RequestContext) -> Self {
        Self {
            data,
            relations: BTreeMap::new(),
            response: None,
            request,
        }
    }

    /// Remove and return the relation sub-document of `field`, if present.
    pub fn take_relation(&mut self, field: &str) -> Option<RelationPayload> {
        self.relations.remove(field)
    }

    /// The record written by the base operation.
    pub fn response(&self) -> LinkResult<&Record> {
        self.response
            .as_ref()
            .ok_or_else(|| LinkError::Other("create operation produced no record".to_string()))
    }
}

/// Envelope of one `update<Model>` call.
#[derive(Debug, Clone)]
pub struct UpdateContext {
    /// Identifies the record being updated; always carries the id field.
    pub filter: Filter,
    pub data: Record,
    pub relations: BTreeMap<String, RelationPayload>,
    pub response: Option<Record>,
    pub request: RequestContext,
}

impl UpdateContext {
    pub fn new(filter: Filter, data: Record, request: RequestContext) -> Self {
        Self {
            filter,
            data,
            relations: BTreeMap::new(),
            response: None,
            request,
        }
    }

    pub fn take_relation(&mut self, field: &str) -> Option<RelationPayload> {
        self.relations.remove(field)
    }

    /// Id of the record being updated.
    pub fn target_id(&self, id_field: &str) -> LinkResult<Value> {
        match self.filter.get(id_field) {
            Some(Value::Null) | None => Err(LinkError::validation(format!(
                "update requires `where.{id_field}`"
            ))),
            Some(id) => Ok(id.clone()),
        }
    }

    pub fn response(&self) -> LinkResult<&Record> {
        self.response
            .as_ref()
            .ok_or_else(|| LinkError::Other("update operation produced no record".to_string()))
    }
}
