//! Records, filters and id helpers.

use crate::error::{LinkError, LinkResult};
use serde_json::{Map, Value};

/// A stored record or a write payload: field name → JSON value.
pub type Record = Map<String, Value>;

/// Record identifiers are kept as opaque JSON values (string or number).
pub type Id = Value;

/// A conjunction of equality constraints, used as the `where` of storage calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: Record,
}

impl Filter {
    /// Create an empty filter (matches every record).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter with a single `field = value` constraint.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and_eq(field, value)
    }

    /// Add a `field = value` constraint.
    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Build a filter from a unique-where object, e.g. `{"id": "42"}`.
    pub fn from_record(fields: Record) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether `record` satisfies every constraint. A missing field compares equal to `null`.
    pub fn matches(&self, record: &Record) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| record.get(field).unwrap_or(&Value::Null) == expected)
    }
}

/// Read the id of a record, failing when it is missing or `null`.
pub fn record_id(record: &Record, id_field: &str) -> LinkResult<Id> {
    match record.get(id_field) {
        Some(Value::Null) | None => Err(LinkError::validation(format!(
            "record has no `{id_field}` field"
        ))),
        Some(id) => Ok(id.clone()),
    }
}

/// Read a nullable key (e.g. a foreign key). `null` and missing both yield `None`.
pub fn optional_key<'a>(record: &'a Record, field: &str) -> Option<&'a Value> {
    match record.get(field) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value),
    }
}

/// Render an id for log lines and error messages.
pub(crate) fn display_id(id: &Id) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
