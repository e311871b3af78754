//! SQLite-backed document store.
//!
//! Each document is one row holding its JSON body. Equality filters are
//! pushed down to SQLite through `json_extract`, so lookups never scan
//! bodies in Rust.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use tracing::debug;

use crate::db::Database;
use crate::error::StorageError;
use crate::store::{new_document_id, resolve_server_timestamps, Document, DocumentStore, Fields, Filter};

/// Document store persisting to a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    db: Arc<Database>,
}

impl SqliteDocumentStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run_blocking<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| StorageError::Unavailable(format!("blocking task failed: {}", e)))?
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find_one(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Option<Document>, StorageError> {
        let (sql, params) = build_find_query(collection, filters)?;
        self.run_blocking(move |conn| {
            let row = conn
                .query_row(&sql, rusqlite::params_from_iter(params), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .optional()?;
            row.map(|(id, body)| parse_document(id, &body)).transpose()
        })
        .await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StorageError> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.run_blocking(move |conn| {
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                    rusqlite::params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            body.map(|b| parse_document(id, &b)).transpose()
        })
        .await
    }

    async fn create(&self, collection: &str, mut fields: Fields) -> Result<String, StorageError> {
        resolve_server_timestamps(&mut fields, Utc::now());
        let id = new_document_id();
        let body = serde_json::to_string(&fields)?;

        let (owned_collection, owned_id) = (collection.to_string(), id.clone());
        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
                rusqlite::params![owned_collection, owned_id, body],
            )?;
            Ok(())
        })
        .await?;

        debug!(collection, id = %id, "Document created");
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, mut fields: Fields) -> Result<(), StorageError> {
        resolve_server_timestamps(&mut fields, Utc::now());

        let (owned_collection, owned_id) = (collection.to_string(), id.to_string());
        self.run_blocking(move |conn| {
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                    rusqlite::params![owned_collection, owned_id],
                    |row| row.get(0),
                )
                .optional()?;
            let body = body.ok_or_else(|| StorageError::NotFound {
                collection: owned_collection.clone(),
                id: owned_id.clone(),
            })?;

            let mut current: Fields = serde_json::from_str(&body)?;
            current.extend(fields);

            conn.execute(
                "UPDATE documents SET body = ?3, updated_at = strftime('%s', 'now')
                 WHERE collection = ?1 AND id = ?2",
                rusqlite::params![owned_collection, owned_id, serde_json::to_string(&current)?],
            )?;
            Ok(())
        })
        .await?;

        debug!(collection, id, "Document updated");
        Ok(())
    }
}

fn parse_document(id: String, body: &str) -> Result<Document, StorageError> {
    Ok(Document {
        id,
        fields: serde_json::from_str(body)?,
    })
}

/// Build the lookup query for a conjunction of equality filters.
fn build_find_query(
    collection: &str,
    filters: &[Filter],
) -> Result<(String, Vec<SqlValue>), StorageError> {
    let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?1");
    let mut params = vec![SqlValue::Text(collection.to_string())];

    for filter in filters {
        params.push(SqlValue::Text(json_path(&filter.field)?));
        let path = params.len();

        match &filter.value {
            Value::Null => sql.push_str(&format!(" AND json_type(body, ?{}) = 'null'", path)),
            Value::Bool(b) => {
                let kind = if *b { "true" } else { "false" };
                sql.push_str(&format!(" AND json_type(body, ?{}) = '{}'", path, kind));
            }
            Value::String(s) => {
                params.push(SqlValue::Text(s.clone()));
                sql.push_str(&format!(
                    " AND json_type(body, ?{p}) = 'text' AND json_extract(body, ?{p}) = ?{v}",
                    p = path,
                    v = params.len()
                ));
            }
            Value::Number(n) => {
                let value = match n.as_i64() {
                    Some(i) => SqlValue::Integer(i),
                    None => SqlValue::Real(
                        n.as_f64()
                            .ok_or_else(|| StorageError::InvalidFilter(filter.field.clone()))?,
                    ),
                };
                params.push(value);
                sql.push_str(&format!(
                    " AND json_type(body, ?{p}) IN ('integer', 'real') AND json_extract(body, ?{p}) = ?{v}",
                    p = path,
                    v = params.len()
                ));
            }
            Value::Array(_) | Value::Object(_) => {
                return Err(StorageError::InvalidFilter(filter.field.clone()))
            }
        }
    }

    sql.push_str(" ORDER BY seq LIMIT 1");
    Ok((sql, params))
}

/// JSON path addressing a top-level key.
fn json_path(field: &str) -> Result<String, StorageError> {
    if field.is_empty() || field.contains('"') {
        return Err(StorageError::InvalidFilter(field.to_string()));
    }
    Ok(format!("$.\"{}\"", field))
}
