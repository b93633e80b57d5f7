//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use nestlink::{
    DataSource, Field, Filter, LinkError, LinkResult, MemoryDataSource, Model, ModelRelation,
    Mutation, Record, RelationEngine, RequestContext,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};

pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("test record must be an object")
}

pub fn ctx() -> RequestContext {
    RequestContext::new().with_request_id("test")
}

/// Memory backend that remembers every write payload and can fail on chosen ids.
pub struct RecordingDataSource {
    pub inner: MemoryDataSource,
    pub writes: Mutex<Vec<(&'static str, Record)>>,
    pub fail_on: Mutex<Option<Value>>,
}

impl RecordingDataSource {
    pub fn new(inner: MemoryDataSource) -> Self {
        Self {
            inner,
            writes: Mutex::new(Vec::new()),
            fail_on: Mutex::new(None),
        }
    }

    /// Make updates of the record with `id` fail with a backend error.
    pub fn fail_updates_of(&self, id: Value) {
        *self.fail_on.lock().unwrap() = Some(id);
    }

    pub fn writes(&self) -> Vec<(&'static str, Record)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataSource for RecordingDataSource {
    async fn find(&self, filter: &Filter, ctx: &RequestContext) -> LinkResult<Option<Record>> {
        self.inner.find(filter, ctx).await
    }

    async fn find_many(&self, filter: &Filter, ctx: &RequestContext) -> LinkResult<Vec<Record>> {
        self.inner.find_many(filter, ctx).await
    }

    async fn create(&self, mutation: Mutation, ctx: &RequestContext) -> LinkResult<Record> {
        self.writes
            .lock()
            .unwrap()
            .push(("create", mutation.data.clone()));
        self.inner.create(mutation, ctx).await
    }

    async fn update(
        &self,
        filter: &Filter,
        mutation: Mutation,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        self.writes
            .lock()
            .unwrap()
            .push(("update", mutation.data.clone()));
        let failing = self.fail_on.lock().unwrap().clone();
        if let Some(id) = failing
            && filter.get("id") == Some(&id)
        {
            return Err(LinkError::backend(format!("update of {id} rejected")));
        }
        self.inner.update(filter, mutation, ctx).await
    }

    async fn delete(&self, filter: &Filter, ctx: &RequestContext) -> LinkResult<Record> {
        self.writes.lock().unwrap().push(("delete", filter.fields().clone()));
        self.inner.delete(filter, ctx).await
    }
}

/// Backend that suspends before every call, so per-id tasks of a batch interleave.
pub struct YieldingDataSource {
    pub inner: Arc<dyn DataSource>,
    yields: usize,
    slow: Option<(Value, usize)>,
}

impl YieldingDataSource {
    pub fn new(inner: Arc<dyn DataSource>) -> Self {
        Self {
            inner,
            yields: 2,
            slow: None,
        }
    }

    /// Calls filtered on `id` suspend `extra` more times than the others.
    pub fn slow_for(mut self, id: Value, extra: usize) -> Self {
        self.slow = Some((id, extra));
        self
    }

    async fn pause(&self, filter: Option<&Filter>) {
        let mut yields = self.yields;
        if let Some((id, extra)) = &self.slow
            && filter.and_then(|f| f.get("id")) == Some(id)
        {
            yields += extra;
        }
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl DataSource for YieldingDataSource {
    async fn find(&self, filter: &Filter, ctx: &RequestContext) -> LinkResult<Option<Record>> {
        self.pause(Some(filter)).await;
        self.inner.find(filter, ctx).await
    }

    async fn find_many(&self, filter: &Filter, ctx: &RequestContext) -> LinkResult<Vec<Record>> {
        self.pause(Some(filter)).await;
        self.inner.find_many(filter, ctx).await
    }

    async fn create(&self, mutation: Mutation, ctx: &RequestContext) -> LinkResult<Record> {
        self.pause(None).await;
        self.inner.create(mutation, ctx).await
    }

    async fn update(
        &self,
        filter: &Filter,
        mutation: Mutation,
        ctx: &RequestContext,
    ) -> LinkResult<Record> {
        self.pause(Some(filter)).await;
        self.inner.update(filter, mutation, ctx).await
    }

    async fn delete(&self, filter: &Filter, ctx: &RequestContext) -> LinkResult<Record> {
        self.pause(Some(filter)).await;
        self.inner.delete(filter, ctx).await
    }
}

/// `Author.books` / `Book.author`, key `authorId` on `Book`.
pub struct Library {
    pub engine: RelationEngine,
    pub authors: Arc<RecordingDataSource>,
    pub books: Arc<RecordingDataSource>,
}

pub fn author_model() -> Model {
    Model::new("Author")
        .field(Field::scalar("id", "ID").auto_generated())
        .field(Field::scalar("name", "String"))
}

pub fn book_model() -> Model {
    Model::new("Book")
        .field(Field::scalar("id", "ID").auto_generated())
        .field(Field::scalar("title", "String"))
        .field(Field::scalar("tags", "String").list())
        .field(Field::scalar("authorId", "ID"))
}

pub fn library(authors: Vec<Value>, books: Vec<Value>) -> Library {
    library_with(authors, books, nestlink::EngineConfig::default())
}

pub fn library_with(
    authors: Vec<Value>,
    books: Vec<Value>,
    config: nestlink::EngineConfig,
) -> Library {
    let authors = Arc::new(RecordingDataSource::new(
        MemoryDataSource::new("Author").with_records(authors.into_iter().map(record)),
    ));
    let books = Arc::new(RecordingDataSource::new(
        MemoryDataSource::new("Book").with_records(books.into_iter().map(record)),
    ));
    let engine = RelationEngine::builder()
        .config(config)
        .model(author_model(), authors.clone())
        .model(book_model(), books.clone())
        .relation(ModelRelation::one_to_many(
            "Author",
            "books",
            "Book",
            Some("author"),
        ))
        .build()
        .expect("library engine");
    Library {
        engine,
        authors,
        books,
    }
}
