//! Entity models.
//!
//! A [`Model`] only lists its own stored fields. Relation fields are declared
//! separately through [`crate::relation::ModelRelation`].

use heck::{ToLowerCamelCase, ToUpperCamelCase};

/// Shape of a stored field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A scalar of the given GraphQL type (`String`, `Int`, ...).
    Scalar { type_name: String },
    /// A nested object stored inline.
    Object { fields: Vec<Field> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub list: bool,
    /// Filled in by storage (ids, timestamps); excluded from inputs.
    pub auto_generated: bool,
}

impl Field {
    pub fn scalar(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Scalar {
                type_name: type_name.into(),
            },
            list: false,
            auto_generated: false,
        }
    }

    pub fn object(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Object { fields },
            list: false,
            auto_generated: false,
        }
    }

    /// Mark the field as a list.
    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }

    /// Mark the field as generated by storage.
    pub fn auto_generated(mut self) -> Self {
        self.auto_generated = true;
        self
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, FieldKind::Scalar { .. })
    }
}

/// An entity participating in the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    name: String,
    fields: Vec<Field>,
}

impl Model {
    /// Create a model with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// `Author` for `author`, `BookTag` for `book_tag`.
    pub fn capital_name(&self) -> String {
        self.name.to_upper_camel_case()
    }

    /// `author` for `Author`, `bookTag` for `BookTag`.
    pub fn camel_name(&self) -> String {
        self.name.to_lower_camel_case()
    }
}
