//! In-memory document store.
//!
//! Keeps documents in insertion order per collection and counts calls so
//! tests can assert on persistence traffic. Writes can be made to fail on
//! demand to exercise best-effort paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::store::{new_document_id, resolve_server_timestamps, Document, DocumentStore, Fields, Filter};

/// Document store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    find_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `find_one` calls served.
    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// Number of `create` calls received, including failed ones.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `update` calls received, including failed ones.
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent `create`/`update` fail with `Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every document in a collection.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .map(|c| c.get(collection).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Document>>>, StorageError> {
        self.collections
            .lock()
            .map_err(|e| StorageError::Database(format!("store lock poisoned: {}", e)))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_one(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Option<Document>, StorageError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let collections = self.lock()?;
        Ok(collections.get(collection).and_then(|docs| {
            docs.iter()
                .find(|doc| filters.iter().all(|f| f.matches(&doc.fields)))
                .cloned()
        }))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StorageError> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn create(&self, collection: &str, mut fields: Fields) -> Result<String, StorageError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;

        resolve_server_timestamps(&mut fields, Utc::now());
        let id = new_document_id();
        self.lock()?
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, mut fields: Fields) -> Result<(), StorageError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;

        resolve_server_timestamps(&mut fields, Utc::now());
        let mut collections = self.lock()?;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StorageError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        doc.fields.extend(fields);
        Ok(())
    }
}
