use super::DataSource;
use crate::context::RequestContext;
use crate::error::{LinkError, LinkResult};
use crate::mutation::Mutation;
use crate::record::{Filter, Record};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// An in-process data source backed by a vector of records.
///
/// Records without an id get a random uuid. Reads and writes are counted so
/// callers can assert how many storage calls a mutation issued.
#[derive(Debug)]
pub struct MemoryDataSource {
    name: String,
    id_field: String,
    rows: Mutex<Vec<Record>>,
    reads: AtomicU64,
    creates: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
}

/// Snapshot of storage call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub reads: u64,
    pub creates: u64,
    pub updates: u64,
    pub deletes: u64,
}

impl StorageStats {
    /// Total number of write calls.
    pub fn writes(&self) -> u64 {
        self.creates + self.updates + self.deletes
    }
}

impl MemoryDataSource {
    /// Create an empty data source. `name` only appears in errors and logs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_field: "id".to_string(),
            rows: Mutex::new(Vec::new()),
            reads: AtomicU64::new(0),
            creates: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
        }
    }

    /// Use a primary key field other than `id`.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Seed the data source with existing records (not counted as writes).
    pub fn with_records(self, records: impl IntoIterator<Item = Record>) -> Self {
        if let Ok(mut rows) = self.rows.lock() {
            rows.extend(records);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of every stored record, in insertion order.
    pub fn records(&self) -> Vec<Record> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            reads: self.reads.load(Ordering::Relaxed),
            creates: self.creates.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters.
    pub fn reset_stats(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.creates.store(0, Ordering::Relaxed);
        self.updates.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
    }

    fn lock(&self) -> LinkResult<std::sync::MutexGuard<'_, Vec<Record>>> {
        self.rows
            .lock()
            .map_err(|_| LinkError::backend(format!("{}: storage lock poisoned", self.name)))
    }

    fn missing(&self, filter: &Filter) -> LinkError {
        LinkError::not_found(format!(
            "{}: no record matches {}",
            self.name,
            Value::Object(filter.fields().clone())
        ))
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn find(&self, filter: &Filter, _ctx: &RequestContext) -> LinkResult<Option<Record>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let rows = self.lock()?;
        Ok(rows.iter().find(|row| filter.matches(row)).cloned())
    }

    async fn find_many(&self, filter: &Filter, _ctx: &RequestContext) -> LinkResult<Vec<Record>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let rows = self.lock()?;
        Ok(rows.iter().filter(|row| filter.matches(row)).cloned().collect())
    }

    async fn create(&self, mutation: Mutation, _ctx: &RequestContext) -> LinkResult<Record> {
        self.creates.fetch_add(1, Ordering::Relaxed);
        let mut record = mutation.data.clone();
        let has_id = matches!(record.get(&self.id_field), Some(id) if !id.is_null());
        if !has_id {
            record.insert(
                self.id_field.clone(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }
        mutation.apply_array_ops(&mut record);

        let mut rows = self.lock()?;
        let id = &record[self.id_field.as_str()];
        if rows.iter().any(|row| row.get(&self.id_field) == Some(id)) {
            return Err(LinkError::backend(format!(
                "{}: duplicate {} {}",
                self.name, self.id_field, id
            )));
        }
        rows.push(record.clone());
        tracing::trace!(target: "nestlink.memory", source = %self.name, id = %id, "created");
        Ok(record)
    }

    async fn update(
        &self,
        filter: &Filter,
        mutation: Mutation,
        _ctx: &RequestContext,
    ) -> LinkResult<Record> {
        self.updates.fetch_add(1, Ordering::Relaxed);
        let mut rows = self.lock()?;
        let Some(row) = rows.iter_mut().find(|row| filter.matches(row)) else {
            return Err(self.missing(filter));
        };
        for (field, value) in &mutation.data {
            if *field == self.id_field {
                continue;
            }
            row.insert(field.clone(), value.clone());
        }
        mutation.apply_array_ops(row);
        tracing::trace!(target: "nestlink.memory", source = %self.name, "updated");
        Ok(row.clone())
    }

    async fn delete(&self, filter: &Filter, _ctx: &RequestContext) -> LinkResult<Record> {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        let mut rows = self.lock()?;
        let Some(index) = rows.iter().position(|row| filter.matches(row)) else {
            return Err(self.missing(filter));
        };
        tracing::trace!(target: "nestlink.memory", source = %self.name, "deleted");
        Ok(rows.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::{ArrayOp, ArrayOperation};
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn crud_roundtrip() {
        let ds = MemoryDataSource::new("books");
        let ctx = RequestContext::new();

        let created = ds
            .create(Mutation::from_data(record(json!({"title": "T"}))), &ctx)
            .await
            .unwrap();
        let id = created["id"].clone();
        assert!(id.is_string());

        let updated = ds
            .update(
                &Filter::eq("id", id.clone()),
                Mutation::from_data(record(json!({"title": "U", "id": "ignored"}))),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(updated["title"], json!("U"));
        assert_eq!(updated["id"], id);

        let found = ds.find(&Filter::eq("title", "U"), &ctx).await.unwrap();
        assert_eq!(found, Some(updated));

        ds.delete(&Filter::eq("id", id.clone()), &ctx).await.unwrap();
        assert!(ds.is_empty());

        let stats = ds.stats();
        assert_eq!(stats.creates, 1);
        assert_eq!(stats.updates, 1);
        assert_eq!(stats.deletes, 1);
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.writes(), 3);
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let ds = MemoryDataSource::new("books");
        let ctx = RequestContext::new();
        let filter = Filter::eq("id", "nope");

        let err = ds
            .update(&filter, Mutation::default(), &ctx)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(ds.delete(&filter, &ctx).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let ds = MemoryDataSource::new("books").with_records([record(json!({"id": 1}))]);
        let err = ds
            .create(
                Mutation::from_data(record(json!({"id": 1}))),
                &RequestContext::new(),
            )
            .await
            .unwrap_err();
        assert!(err.is_backend());
        assert_eq!(ds.stats().creates, 1);
    }

    #[tokio::test]
    async fn list_operations_are_applied() {
        let ds = MemoryDataSource::new("posts");
        let ctx = RequestContext::new();
        let created = ds
            .create(
                Mutation {
                    data: record(json!({"id": "p1"})),
                    array_ops: vec![ArrayOperation {
                        field: "tags".into(),
                        op: ArrayOp::Set,
                        values: vec![json!("rust")],
                    }],
                },
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(created["tags"], json!(["rust"]));
    }
}
