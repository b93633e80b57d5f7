//! Mutation surface: SDL for `create<Model>` / `update<Model>` and the base
//! storage operations the relation hooks wrap.

mod create;
mod update;

pub use create::{CreatePlugin, StoreCreate};
pub use update::{StoreUpdate, UpdatePlugin};

use crate::model::{Field, FieldKind, Model};
use crate::relation::{Cardinality, RelationField};
use heck::ToUpperCamelCase;

/// Receives generated schema fragments.
pub trait SchemaRoot {
    fn add_type(&mut self, _sdl: String) {}

    fn add_input(&mut self, sdl: String);

    fn add_mutation(&mut self, field: String);
}

/// Names of the per-model input types. Returned names are used verbatim.
pub trait InputNames: Send + Sync {
    fn where_unique_input(&self, model: &str) -> String;

    fn create_input(&self, model: &str) -> String;

    fn update_input(&self, model: &str) -> String;
}

/// `<Model>WhereUniqueInput`, `<Model>CreateInput`, `<Model>UpdateInput`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInputNames;

impl InputNames for DefaultInputNames {
    fn where_unique_input(&self, model: &str) -> String {
        format!("{}WhereUniqueInput", model.to_upper_camel_case())
    }

    fn create_input(&self, model: &str) -> String {
        format!("{}CreateInput", model.to_upper_camel_case())
    }

    fn update_input(&self, model: &str) -> String {
        format!("{}UpdateInput", model.to_upper_camel_case())
    }
}

/// Collects SDL in memory and renders it as one document.
#[derive(Debug, Clone, Default)]
pub struct SdlRoot {
    types: Vec<String>,
    inputs: Vec<String>,
    mutations: Vec<String>,
}

impl SdlRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn mutations(&self) -> &[String] {
        &self.mutations
    }

    /// Types, then inputs, then a `Mutation` type holding every mutation field.
    pub fn render(&self) -> String {
        let mut blocks: Vec<String> = self.types.iter().chain(&self.inputs).cloned().collect();
        if !self.mutations.is_empty() {
            let fields: Vec<String> = self.mutations.iter().map(|m| format!("  {m}")).collect();
            blocks.push(format!("type Mutation {{\n{}\n}}", fields.join("\n")));
        }
        blocks.join("\n\n")
    }
}

impl SchemaRoot for SdlRoot {
    fn add_type(&mut self, sdl: String) {
        self.types.push(sdl);
    }

    fn add_input(&mut self, sdl: String) {
        self.inputs.push(sdl);
    }

    fn add_mutation(&mut self, field: String) {
        self.mutations.push(field);
    }
}

/// `input <name> { ... }` / `type <name> { ... }`
pub(crate) fn block(keyword: &str, name: &str, fields: &[String]) -> String {
    let body: Vec<String> = fields.iter().map(|field| format!("  {field}")).collect();
    format!("{keyword} {name} {{\n{}\n}}", body.join("\n"))
}

/// `<Model><Field>` prefix for types derived from one field.
pub(crate) fn field_type_prefix(model: &str, field: &str) -> String {
    format!("{}{}", model.to_upper_camel_case(), field.to_upper_camel_case())
}

fn scalar_type(field: &Field) -> Option<&str> {
    match &field.kind {
        FieldKind::Scalar { type_name } => Some(type_name.as_str()),
        FieldKind::Object { .. } => None,
    }
}

fn wrap_list(field: &Field, name: String) -> String {
    if field.list { format!("[{name}]") } else { name }
}

/// Emit `type <Model>` with stored and relation fields, plus nested object types.
pub(crate) fn emit_object_type(model: &Model, relations: &[RelationField], root: &mut dyn SchemaRoot) {
    let mut lines = object_fields(&model.capital_name(), model.fields(), root);
    for relation in relations {
        let target = relation.target.to_upper_camel_case();
        let ty = match relation.cardinality {
            Cardinality::One => target,
            Cardinality::Many => format!("[{target}!]!"),
        };
        lines.push(format!("{}: {ty}", relation.field));
    }
    root.add_type(block("type", &model.capital_name(), &lines));
}

fn object_fields(prefix: &str, fields: &[Field], root: &mut dyn SchemaRoot) -> Vec<String> {
    fields
        .iter()
        .map(|field| {
            let ty = match scalar_type(field) {
                Some(scalar) => scalar.to_string(),
                None => {
                    let nested = field_type_prefix(prefix, &field.name);
                    if let FieldKind::Object { fields } = &field.kind {
                        let lines = object_fields(&nested, fields, root);
                        root.add_type(block("type", &nested, &lines));
                    }
                    nested
                }
            };
            format!("{}: {}", field.name, wrap_list(field, ty))
        })
        .collect()
}

/// Emit `input <Model>WhereUniqueInput { <id_field>: ID }`.
pub(crate) fn emit_where_unique(model: &Model, id_field: &str, names: &dyn InputNames, root: &mut dyn SchemaRoot) {
    root.add_input(block(
        "input",
        &names.where_unique_input(model.name()),
        &[format!("{id_field}: ID")],
    ));
}

/// Input-field lines for stored fields, registering wrapper inputs as needed.
///
/// Top-level list fields take an operation object (`{set}` on create,
/// `{set, add, remove}` on update) named `<Prefix><Field>List{Create,Update}Input`.
/// Nested objects get their own `<Prefix><Field>{Create,Update}Input`; lists
/// inside them are plain `[T]`.
pub(crate) fn input_fields(
    prefix: &str,
    fields: &[Field],
    update: bool,
    root: &mut dyn SchemaRoot,
) -> Vec<String> {
    level_input_fields(prefix, fields, update, true, root)
}

fn level_input_fields(
    prefix: &str,
    fields: &[Field],
    update: bool,
    top: bool,
    root: &mut dyn SchemaRoot,
) -> Vec<String> {
    let suffix = if update { "UpdateInput" } else { "CreateInput" };
    fields
        .iter()
        .filter(|field| !field.auto_generated)
        .map(|field| {
            let nested = field_type_prefix(prefix, &field.name);
            let item = match &field.kind {
                FieldKind::Scalar { type_name } => type_name.clone(),
                FieldKind::Object { fields } => {
                    let name = format!("{nested}{suffix}");
                    let lines = level_input_fields(&nested, fields, update, false, root);
                    root.add_input(block("input", &name, &lines));
                    name
                }
            };
            let ty = if top && field.list {
                let name = format!("{nested}List{suffix}");
                let mut ops = vec![format!("set: [{item}]")];
                if update {
                    ops.push(format!("add: [{item}]"));
                    ops.push(format!("remove: [{item}]"));
                }
                root.add_input(block("input", &name, &ops));
                name
            } else {
                wrap_list(field, item)
            };
            format!("{}: {ty}", field.name)
        })
        .collect()
}
