//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use crate::error::StorageError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| StorageError::Database(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StorageError::Database(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: documents");
    }

    Ok(())
}

/// Version 1: one JSON body per document, grouped by collection.
fn apply_v1(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            collection  TEXT NOT NULL,
            id          TEXT NOT NULL,
            body        TEXT NOT NULL CHECK (json_valid(body)),
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            updated_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            UNIQUE (collection, id)
        );

        CREATE INDEX IF NOT EXISTS idx_documents_collection
            ON documents (collection, seq);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'documents');
        ",
    )
    .map_err(|e| StorageError::Database(format!("Migration v1 failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_body_must_be_json() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES ('c', 'i', 'not json')",
            [],
        );
        assert!(result.is_err());
    }
}
