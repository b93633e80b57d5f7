//! Write payloads handed to data sources.
//!
//! List fields arrive on the wire wrapped in an operation object
//! (`{"tags": {"set": ["a", "b"]}}`); [`MutationFactory`] unwraps them into
//! [`ArrayOperation`]s so data sources never see the wrapper.

use crate::error::{LinkError, LinkResult};
use crate::record::Record;
use serde_json::Value;
use std::collections::BTreeSet;

/// Operation on a list field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayOp {
    /// Replace the whole list.
    Set,
    /// Append values.
    Add,
    /// Remove every occurrence of the values.
    Remove,
}

impl ArrayOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }

    fn parse(key: &str) -> Option<Self> {
        match key {
            "set" => Some(Self::Set),
            "add" => Some(Self::Add),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayOperation {
    pub field: String,
    pub op: ArrayOp,
    pub values: Vec<Value>,
}

/// A write: scalar data plus list-field operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mutation {
    pub data: Record,
    pub array_ops: Vec<ArrayOperation>,
}

impl Mutation {
    /// A mutation carrying only scalar data.
    pub fn from_data(data: Record) -> Self {
        Self {
            data,
            array_ops: Vec::new(),
        }
    }

    /// Apply list operations to `record` in order.
    pub fn apply_array_ops(&self, record: &mut Record) {
        for operation in &self.array_ops {
            let current = record
                .entry(operation.field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            let Value::Array(items) = current else {
                continue;
            };
            match operation.op {
                ArrayOp::Set => *items = operation.values.clone(),
                ArrayOp::Add => items.extend(operation.values.iter().cloned()),
                ArrayOp::Remove => items.retain(|item| !operation.values.contains(item)),
            }
        }
    }
}

/// Which operations a list field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
}

/// Converts wire payloads of one model into [`Mutation`]s.
#[derive(Debug, Clone, Default)]
pub struct MutationFactory {
    array_fields: BTreeSet<String>,
}

impl MutationFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `field` as a list field whose value is an operation object.
    pub fn mark_array_field(&mut self, field: impl Into<String>) {
        self.array_fields.insert(field.into());
    }

    pub fn is_array_field(&self, field: &str) -> bool {
        self.array_fields.contains(field)
    }

    pub fn create_mutation(&self, payload: Record) -> LinkResult<Mutation> {
        self.build(payload, MutationKind::Create)
    }

    pub fn update_mutation(&self, payload: Record) -> LinkResult<Mutation> {
        self.build(payload, MutationKind::Update)
    }

    fn build(&self, payload: Record, kind: MutationKind) -> LinkResult<Mutation> {
        let mut mutation = Mutation::default();
        for (field, value) in payload {
            if !self.array_fields.contains(&field) {
                mutation.data.insert(field, value);
                continue;
            }
            let Value::Object(ops) = value else {
                if value.is_null() {
                    continue;
                }
                return Err(LinkError::validation(format!(
                    "list field `{field}` expects an operation object"
                )));
            };
            for (key, values) in ops {
                let op = match ArrayOp::parse(&key) {
                    Some(ArrayOp::Set) => ArrayOp::Set,
                    Some(op) if kind == MutationKind::Update => op,
                    _ => {
                        return Err(LinkError::validation(format!(
                            "unsupported operation `{key}` on list field `{field}`"
                        )));
                    }
                };
                let values = match values {
                    Value::Array(values) => values,
                    Value::Null => continue,
                    _ => {
                        return Err(LinkError::validation(format!(
                            "`{field}.{key}` expects a list"
                        )));
                    }
                };
                mutation.array_ops.push(ArrayOperation {
                    field: field.clone(),
                    op,
                    values,
                });
            }
        }
        Ok(mutation)
    }
}
