//! # nestlink
//!
//! Relation hooks for nested mutations over pluggable data sources.
//!
//! ## Features
//!
//! - **Four relation shapes**: one-to-many, bidirectional and unidirectional one-to-one, many-to-many
//! - **Nested writes**: `connect`, `create`, `disconnect` and `delete` under a relation field
//! - **One write when possible**: the side that stores the foreign key merges it into its own write
//! - **Fail-fast batches**: per-id operations run concurrently; the first error rejects the call
//! - **Lazy resolvers**: relation fields are joined only when asked for, and never write
//! - **Pluggable storage**: anything implementing [`DataSource`]; [`MemoryDataSource`] is bundled
//!
//! ## Example
//!
//! ```ignore
//! use nestlink::{Field, MemoryDataSource, Model, ModelRelation, RelationEngine, RequestContext};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let engine = RelationEngine::builder()
//!     .model(
//!         Model::new("Author").field(Field::scalar("name", "String")),
//!         Arc::new(MemoryDataSource::new("Author")),
//!     )
//!     .model(
//!         Model::new("Book").field(Field::scalar("title", "String")),
//!         Arc::new(MemoryDataSource::new("Book")),
//!     )
//!     .relation(ModelRelation::one_to_many("Author", "books", "Book", Some("author")))
//!     .build()?;
//!
//! let data = json!({"name": "A", "books": {"create": [{"title": "T"}]}});
//! let author = engine
//!     .create("Author", data.as_object().cloned().unwrap(), RequestContext::new())
//!     .await?;
//! let books = engine
//!     .resolve_field("Author", "books", &author, &RequestContext::new())
//!     .await?;
//! ```
//!
//! ## Ordering
//!
//! Operations are considered in the fixed order connect, create, disconnect,
//! delete ([`RelationOp::PRECEDENCE`]). A to-one field runs only the first
//! operation present; a to-many field runs every non-empty list as one batch,
//! batch after batch in that order. Nothing is rolled back on failure.

pub mod config;
pub mod context;
pub mod datasource;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod model;
pub mod mutation;
pub mod plugin;
pub mod record;
pub mod relation;

pub use config::EngineConfig;
pub use context::{CreateContext, RequestContext, UpdateContext};
pub use datasource::{DataSource, MemoryDataSource, ModelStore, StorageStats};
pub use engine::{RelationEngine, RelationEngineBuilder};
pub use error::{LinkError, LinkResult};
pub use hooks::{
    CreateOperation, HookMap, ModelHooks, RelationHook, RelationOp, RelationPayload,
    UpdateOperation, build_hook_map,
};
pub use model::{Field, FieldKind, Model};
pub use mutation::{ArrayOp, ArrayOperation, Mutation, MutationFactory};
pub use plugin::{CreatePlugin, DefaultInputNames, InputNames, SchemaRoot, SdlRoot, UpdatePlugin};
pub use record::{Filter, Id, Record};
pub use relation::{Cardinality, ModelRelation, Relation, RelationField, RelationKind};
