//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, crate::now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "migrated object store schema");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Namespaces (buckets)
        CREATE TABLE namespaces (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        );

        -- Objects: one row per (namespace, key)
        CREATE TABLE objects (
            namespace TEXT NOT NULL REFERENCES namespaces(name),
            key TEXT NOT NULL,
            etag TEXT NOT NULL,               -- md5 hex, or composite "<hex>-<n>"
            content_type TEXT NOT NULL,
            size INTEGER NOT NULL,
            body BLOB NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (namespace, key)
        );

        -- In-progress multipart uploads
        CREATE TABLE multipart_uploads (
            upload_id INTEGER PRIMARY KEY AUTOINCREMENT,
            namespace TEXT NOT NULL REFERENCES namespaces(name),
            key TEXT NOT NULL,
            content_type TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        -- Parts of in-progress uploads
        CREATE TABLE multipart_parts (
            upload_id INTEGER NOT NULL REFERENCES multipart_uploads(upload_id),
            part_number INTEGER NOT NULL,     -- 1-based
            etag TEXT NOT NULL,
            body BLOB NOT NULL,
            PRIMARY KEY (upload_id, part_number)
        );
        "#,
    )?;

    Ok(())
}
