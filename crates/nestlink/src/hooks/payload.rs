//! Relation sub-documents, parsed once at the mutation boundary.
//!
//! The wire shape under a relation field is
//! `{connect, create, disconnect, delete}`. A key that is present takes part
//! even when its list is empty; a `null` key counts as absent.

use crate::config::EngineConfig;
use crate::error::{LinkError, LinkResult};
use crate::record::{Id, Record};
use crate::relation::Cardinality;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A nested relation operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationOp {
    Connect,
    Create,
    Disconnect,
    Delete,
}

impl RelationOp {
    /// Order in which operations are considered. A to-one field runs only the
    /// first present operation; a to-many field runs every batch in this order.
    pub const PRECEDENCE: [RelationOp; 4] = [
        RelationOp::Connect,
        RelationOp::Create,
        RelationOp::Disconnect,
        RelationOp::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Create => "create",
            Self::Disconnect => "disconnect",
            Self::Delete => "delete",
        }
    }

    fn parse(key: &str) -> Option<Self> {
        Self::PRECEDENCE.into_iter().find(|op| op.as_str() == key)
    }

    /// Pick the operation that wins among `present`.
    pub fn first_of(present: &[RelationOp]) -> Option<RelationOp> {
        Self::PRECEDENCE
            .into_iter()
            .find(|op| present.contains(op))
    }
}

impl fmt::Display for RelationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which operations a payload may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// `connect` and `create` only.
    Create,
    /// All four operations.
    Update,
}

impl PayloadMode {
    fn allows(&self, op: RelationOp) -> bool {
        match self {
            Self::Create => matches!(op, RelationOp::Connect | RelationOp::Create),
            Self::Update => true,
        }
    }
}

/// Sub-document of a to-one relation field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToOnePayload {
    pub connect: Option<Id>,
    pub create: Option<Record>,
    pub disconnect: bool,
    pub delete: bool,
}

/// The single operation a to-one sub-document resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum ToOneAction {
    Connect(Id),
    Create(Record),
    Disconnect,
    Delete,
}

impl ToOneAction {
    pub fn op(&self) -> RelationOp {
        match self {
            Self::Connect(_) => RelationOp::Connect,
            Self::Create(_) => RelationOp::Create,
            Self::Disconnect => RelationOp::Disconnect,
            Self::Delete => RelationOp::Delete,
        }
    }
}

impl ToOnePayload {
    /// Requested operations, in precedence order.
    pub fn present(&self) -> Vec<RelationOp> {
        RelationOp::PRECEDENCE
            .into_iter()
            .filter(|op| match op {
                RelationOp::Connect => self.connect.is_some(),
                RelationOp::Create => self.create.is_some(),
                RelationOp::Disconnect => self.disconnect,
                RelationOp::Delete => self.delete,
            })
            .collect()
    }

    /// Resolve to the highest-precedence requested operation. The rest are dropped.
    pub fn into_action(self) -> Option<ToOneAction> {
        match RelationOp::first_of(&self.present())? {
            RelationOp::Connect => self.connect.map(ToOneAction::Connect),
            RelationOp::Create => self.create.map(ToOneAction::Create),
            RelationOp::Disconnect => Some(ToOneAction::Disconnect),
            RelationOp::Delete => Some(ToOneAction::Delete),
        }
    }
}

/// Sub-document of a to-many relation field. Each list is one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToManyPayload {
    pub connect: Vec<Id>,
    pub create: Vec<Record>,
    pub disconnect: Vec<Id>,
    pub delete: Vec<Id>,
}

impl ToManyPayload {
    pub fn is_empty(&self) -> bool {
        self.connect.is_empty()
            && self.create.is_empty()
            && self.disconnect.is_empty()
            && self.delete.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelationPayload {
    One(ToOnePayload),
    Many(ToManyPayload),
}

impl RelationPayload {
    /// Parse the value found under relation field `field`. `null` yields `None`.
    pub fn parse(
        field: &str,
        value: Value,
        cardinality: Cardinality,
        mode: PayloadMode,
        config: &EngineConfig,
    ) -> LinkResult<Option<Self>> {
        let object = match value {
            Value::Null => return Ok(None),
            Value::Object(object) => object,
            other => {
                return Err(LinkError::validation(format!(
                    "`{field}` expects an object, got {other}"
                )));
            }
        };
        let parser = Parser {
            field,
            id_field: &config.id_field,
        };

        let mut one = ToOnePayload::default();
        let mut many = ToManyPayload::default();
        for (key, value) in object {
            let Some(op) = RelationOp::parse(&key) else {
                if config.strict_payload {
                    return Err(LinkError::validation(format!(
                        "unknown key `{key}` in `{field}`"
                    )));
                }
                continue;
            };
            if value.is_null() {
                continue;
            }
            if !mode.allows(op) {
                return Err(LinkError::validation(format!(
                    "`{field}.{op}` is only allowed in updates"
                )));
            }
            match cardinality {
                Cardinality::One => match op {
                    RelationOp::Connect => one.connect = Some(parser.unique_id(op, value)?),
                    RelationOp::Create => one.create = Some(parser.object(op, value)?),
                    RelationOp::Disconnect => one.disconnect = parser.flag(op, value)?,
                    RelationOp::Delete => one.delete = parser.flag(op, value)?,
                },
                Cardinality::Many => {
                    let items = parser.list(value);
                    match op {
                        RelationOp::Connect => many.connect = parser.unique_ids(op, items)?,
                        RelationOp::Create => {
                            many.create = items
                                .into_iter()
                                .map(|item| parser.object(op, item))
                                .collect::<LinkResult<_>>()?
                        }
                        RelationOp::Disconnect => many.disconnect = parser.unique_ids(op, items)?,
                        RelationOp::Delete => many.delete = parser.unique_ids(op, items)?,
                    }
                }
            }
        }

        Ok(Some(match cardinality {
            Cardinality::One => Self::One(one),
            Cardinality::Many => Self::Many(many),
        }))
    }

    /// Records of the `create` operation, one for to-one, a batch for to-many.
    pub fn creates_mut(&mut self) -> Vec<&mut Record> {
        match self {
            Self::One(payload) => payload.create.iter_mut().collect(),
            Self::Many(payload) => payload.create.iter_mut().collect(),
        }
    }

    pub fn into_one(self, field: &str) -> LinkResult<ToOnePayload> {
        match self {
            Self::One(payload) => Ok(payload),
            Self::Many(_) => Err(LinkError::validation(format!(
                "`{field}` is a to-one relation"
            ))),
        }
    }

    pub fn into_many(self, field: &str) -> LinkResult<ToManyPayload> {
        match self {
            Self::Many(payload) => Ok(payload),
            Self::One(_) => Err(LinkError::validation(format!(
                "`{field}` is a to-many relation"
            ))),
        }
    }
}

struct Parser<'a> {
    field: &'a str,
    id_field: &'a str,
}

impl Parser<'_> {
    fn object(&self, op: RelationOp, value: Value) -> LinkResult<Record> {
        match value {
            Value::Object(object) => Ok(object),
            other => Err(LinkError::validation(format!(
                "`{}.{op}` expects an object, got {other}",
                self.field
            ))),
        }
    }

    fn unique_id(&self, op: RelationOp, value: Value) -> LinkResult<Id> {
        let mut object = self.object(op, value)?;
        match object.remove(self.id_field) {
            Some(Value::Null) | None => Err(LinkError::validation(format!(
                "`{}.{op}` needs `{}`",
                self.field, self.id_field
            ))),
            Some(id) => Ok(id),
        }
    }

    /// Ids in first-seen order. Repeated ids collapse into one batch item.
    fn unique_ids(&self, op: RelationOp, items: Vec<Value>) -> LinkResult<Vec<Id>> {
        let mut ids: Vec<Id> = Vec::with_capacity(items.len());
        for item in items {
            let id = self.unique_id(op, item)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn flag(&self, op: RelationOp, value: Value) -> LinkResult<bool> {
        value.as_bool().ok_or_else(|| {
            LinkError::validation(format!("`{}.{op}` expects a boolean", self.field))
        })
    }

    /// A single value stands for a one-element list.
    fn list(&self, value: Value) -> Vec<Value> {
        match value {
            Value::Array(items) => items,
            single => vec![single],
        }
    }
}

/// Strip every relation field in `fields` out of `data` and parse it.
/// Fields holding `null` are stripped and ignored.
pub fn split_relations<'a>(
    data: &mut Record,
    fields: impl IntoIterator<Item = (&'a str, Cardinality)>,
    mode: PayloadMode,
    config: &EngineConfig,
) -> LinkResult<BTreeMap<String, RelationPayload>> {
    let mut relations = BTreeMap::new();
    for (field, cardinality) in fields {
        let Some(value) = data.remove(field) else {
            continue;
        };
        if let Some(payload) = RelationPayload::parse(field, value, cardinality, mode, config)? {
            relations.insert(field.to_string(), payload);
        }
    }
    Ok(relations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value, cardinality: Cardinality, mode: PayloadMode) -> LinkResult<Option<RelationPayload>> {
        RelationPayload::parse("books", value, cardinality, mode, &EngineConfig::default())
    }

    #[test]
    fn precedence_is_connect_create_disconnect_delete() {
        use RelationOp::*;
        assert_eq!(RelationOp::first_of(&[Delete, Disconnect, Create, Connect]), Some(Connect));
        assert_eq!(RelationOp::first_of(&[Delete, Create]), Some(Create));
        assert_eq!(RelationOp::first_of(&[Delete, Disconnect]), Some(Disconnect));
        assert_eq!(RelationOp::first_of(&[]), None);
    }

    #[test]
    fn to_one_action_uses_precedence() {
        let payload = parse(
            json!({"connect": {"id": "a1"}, "disconnect": true}),
            Cardinality::One,
            PayloadMode::Update,
        )
        .unwrap()
        .unwrap()
        .into_one("author")
        .unwrap();
        assert_eq!(payload.present(), vec![RelationOp::Connect, RelationOp::Disconnect]);
        assert_eq!(payload.into_action(), Some(ToOneAction::Connect(json!("a1"))));

        let payload = parse(json!({"disconnect": false}), Cardinality::One, PayloadMode::Update)
            .unwrap()
            .unwrap()
            .into_one("author")
            .unwrap();
        assert_eq!(payload.into_action(), None);
    }

    #[test]
    fn to_many_lists() {
        let payload = parse(
            json!({
                "connect": [{"id": "b1"}, {"id": "b2"}],
                "create": {"title": "T"},
                "delete": []
            }),
            Cardinality::Many,
            PayloadMode::Update,
        )
        .unwrap()
        .unwrap()
        .into_many("books")
        .unwrap();
        assert_eq!(payload.connect, vec![json!("b1"), json!("b2")]);
        assert_eq!(payload.create.len(), 1);
        assert!(payload.delete.is_empty());
    }

    #[test]
    fn repeated_ids_are_collapsed() {
        let payload = parse(
            json!({
                "connect": [{"id": "b1"}, {"id": "b2"}, {"id": "b1"}],
                "disconnect": [{"id": 7}, {"id": 7}]
            }),
            Cardinality::Many,
            PayloadMode::Update,
        )
        .unwrap()
        .unwrap()
        .into_many("books")
        .unwrap();
        assert_eq!(payload.connect, vec![json!("b1"), json!("b2")]);
        assert_eq!(payload.disconnect, vec![json!(7)]);
    }

    #[test]
    fn rejects_malformed_payloads() {
        let err = parse(json!({"attach": []}), Cardinality::Many, PayloadMode::Update).unwrap_err();
        assert!(err.is_validation());

        let err = parse(json!({"delete": [{"id": "b1"}]}), Cardinality::Many, PayloadMode::Create)
            .unwrap_err();
        assert!(err.is_validation());

        let err = parse(json!({"connect": [{"title": "T"}]}), Cardinality::Many, PayloadMode::Create)
            .unwrap_err();
        assert!(err.is_validation());

        let err = parse(json!({"disconnect": "yes"}), Cardinality::One, PayloadMode::Update)
            .unwrap_err();
        assert!(err.is_validation());

        let err = parse(json!([1, 2]), Cardinality::Many, PayloadMode::Create).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn lenient_mode_ignores_unknown_keys() {
        let config = EngineConfig::default().with_strict_payload(false);
        let payload = RelationPayload::parse(
            "books",
            json!({"attach": [], "connect": [{"id": "b1"}]}),
            Cardinality::Many,
            PayloadMode::Create,
            &config,
        )
        .unwrap()
        .unwrap();
        assert!(matches!(payload, RelationPayload::Many(p) if p.connect.len() == 1));
    }

    #[test]
    fn split_strips_relation_fields() {
        let mut data = json!({"name": "A", "books": {"create": []}, "avatar": null})
            .as_object()
            .cloned()
            .unwrap();
        let relations = split_relations(
            &mut data,
            [("books", Cardinality::Many), ("avatar", Cardinality::One)],
            PayloadMode::Create,
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(Value::Object(data), json!({"name": "A"}));
        assert_eq!(relations.len(), 1);
        assert!(relations.contains_key("books"));
    }
}
