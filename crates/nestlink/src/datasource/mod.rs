//! Storage backend contract.
//!
//! Relation hooks never touch storage directly; every read and write goes
//! through a [`DataSource`]. Errors returned by a data source are propagated
//! unchanged to the caller of the mutation.

mod memory;
mod store;

pub use memory::{MemoryDataSource, StorageStats};
pub use store::ModelStore;

use crate::context::RequestContext;
use crate::error::LinkResult;
use crate::mutation::Mutation;
use crate::record::{Filter, Record};
use async_trait::async_trait;

/// A trait implemented by storage backends.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Return the first record matching `filter`, if any.
    async fn find(&self, filter: &Filter, ctx: &RequestContext) -> LinkResult<Option<Record>>;

    /// Return every record matching `filter`.
    async fn find_many(&self, filter: &Filter, ctx: &RequestContext) -> LinkResult<Vec<Record>>;

    /// Insert a record and return it as stored (including its id).
    async fn create(&self, mutation: Mutation, ctx: &RequestContext) -> LinkResult<Record>;

    /// Update the record matching `filter` and return it as stored.
    async fn update(
        &self,
        filter: &Filter,
        mutation: Mutation,
        ctx: &RequestContext,
    ) -> LinkResult<Record>;

    /// Delete the record matching `filter` and return it.
    async fn delete(&self, filter: &Filter, ctx: &RequestContext) -> LinkResult<Record>;
}
