//! Sentio storage crate - document store abstraction and backends.
//!
//! Provides the collection-based `DocumentStore` interface used by the
//! emotion ledger and the account repository, a WAL-mode SQLite backend
//! with migrations, and an in-memory backend for tests and ephemeral runs.

pub mod accounts;
pub mod db;
pub mod error;
pub mod memory;
pub mod migrations;
pub mod sqlite;
pub mod store;

pub use accounts::{AccountError, AccountRepository, ACCOUNTS_COLLECTION};
pub use db::Database;
pub use error::StorageError;
pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;
pub use store::{server_timestamp, Document, DocumentStore, Fields, Filter};
