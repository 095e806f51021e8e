//! SQLite implementation of the ObjectStore trait.
//!
//! A local, persistent stand-in for a remote bucket: useful as an offline
//! sync target and for end-to-end tests. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use bucketsync_core::{md5_digest, Fingerprint, Namespace, ObjectKey};

use crate::error::{Result, StoreError};
use crate::memory::assemble_parts;
use crate::migration;
use crate::now_millis;
use crate::traits::{
    CompletedPart, ObjectPage, ObjectStore, ObjectSummary, StoredObject, UploadId,
};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All trait operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a namespace. Creating an existing namespace is a no-op.
    pub fn create_namespace(&self, namespace: &Namespace) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO namespaces (name, created_at) VALUES (?1, ?2)",
                params![namespace.as_str(), now_millis()],
            )?;
            Ok(())
        })
    }

    /// Fetch an object.
    pub fn get_object(&self, namespace: &Namespace, key: &ObjectKey) -> Result<Option<StoredObject>> {
        self.with_conn(|conn| {
            ensure_namespace(conn, namespace)?;
            let row = conn
                .query_row(
                    "SELECT body, etag, content_type FROM objects WHERE namespace = ?1 AND key = ?2",
                    params![namespace.as_str(), key.as_str()],
                    |row| {
                        Ok((
                            row.get::<_, Vec<u8>>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()?;

            Ok(row.map(|(body, etag, content_type)| StoredObject {
                body: Bytes::from(body),
                fingerprint: Fingerprint::from_remote(etag),
                content_type,
            }))
        })
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(poisoned)?;
        f(&conn)
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(poisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Database(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
        Some(format!("mutex poisoned: {}", e)),
    ))
}

fn ensure_namespace(conn: &Connection, namespace: &Namespace) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM namespaces WHERE name = ?1",
            params![namespace.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    match exists {
        Some(_) => Ok(()),
        None => Err(StoreError::NamespaceNotFound(namespace.to_string())),
    }
}

fn parse_upload_id(upload_id: &UploadId) -> Result<i64> {
    upload_id
        .as_str()
        .parse()
        .map_err(|_| StoreError::UploadNotFound(upload_id.to_string()))
}

#[async_trait]
impl ObjectStore for SqliteStore {
    async fn list_objects(
        &self,
        namespace: &Namespace,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ObjectPage> {
        let namespace = namespace.clone();
        let after = continuation.unwrap_or_default().to_string();
        let max_keys = max_keys.max(1);

        self.blocking(move |conn| {
            ensure_namespace(conn, &namespace)?;

            let mut stmt = conn.prepare(
                "SELECT key, etag, size FROM objects
                 WHERE namespace = ?1 AND key > ?2
                 ORDER BY key
                 LIMIT ?3",
            )?;

            let mut objects = stmt
                .query_map(
                    params![namespace.as_str(), after, (max_keys + 1) as i64],
                    |row| {
                        Ok(ObjectSummary {
                            key: ObjectKey::new(row.get::<_, String>(0)?),
                            fingerprint: Fingerprint::from_remote(row.get::<_, String>(1)?),
                            size: row.get::<_, i64>(2)? as u64,
                        })
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let next_token = if objects.len() > max_keys {
                objects.truncate(max_keys);
                objects.last().map(|last| last.key.to_string())
            } else {
                None
            };

            Ok(ObjectPage {
                objects,
                next_token,
            })
        })
        .await
    }

    async fn put_object(
        &self,
        namespace: &Namespace,
        key: &ObjectKey,
        body: Bytes,
        content_type: &str,
    ) -> Result<Fingerprint> {
        let namespace = namespace.clone();
        let key = key.clone();
        let content_type = content_type.to_string();

        self.blocking(move |conn| {
            ensure_namespace(conn, &namespace)?;
            let fingerprint = Fingerprint::from_digest(&md5_digest(&body));

            conn.execute(
                "INSERT OR REPLACE INTO objects
                 (namespace, key, etag, content_type, size, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    namespace.as_str(),
                    key.as_str(),
                    fingerprint.as_str(),
                    content_type,
                    body.len() as i64,
                    body.as_ref(),
                    now_millis(),
                ],
            )?;

            Ok(fingerprint)
        })
        .await
    }

    async fn create_multipart_upload(
        &self,
        namespace: &Namespace,
        key: &ObjectKey,
        content_type: &str,
    ) -> Result<UploadId> {
        let namespace = namespace.clone();
        let key = key.clone();
        let content_type = content_type.to_string();

        self.blocking(move |conn| {
            ensure_namespace(conn, &namespace)?;
            conn.execute(
                "INSERT INTO multipart_uploads (namespace, key, content_type, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![namespace.as_str(), key.as_str(), content_type, now_millis()],
            )?;
            Ok(UploadId(conn.last_insert_rowid().to_string()))
        })
        .await
    }

    async fn upload_part(
        &self,
        upload_id: &UploadId,
        part_number: u32,
        body: Bytes,
    ) -> Result<Fingerprint> {
        if part_number == 0 {
            return Err(StoreError::InvalidPart {
                upload_id: upload_id.to_string(),
                part_number,
                reason: "part numbers start at 1".into(),
            });
        }

        let upload_id = upload_id.clone();
        let row_id = parse_upload_id(&upload_id)?;

        self.blocking(move |conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT upload_id FROM multipart_uploads WHERE upload_id = ?1",
                    params![row_id],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::UploadNotFound(upload_id.to_string()));
            }

            let fingerprint = Fingerprint::from_digest(&md5_digest(&body));
            conn.execute(
                "INSERT OR REPLACE INTO multipart_parts (upload_id, part_number, etag, body)
                 VALUES (?1, ?2, ?3, ?4)",
                params![row_id, part_number, fingerprint.as_str(), body.as_ref()],
            )?;

            Ok(fingerprint)
        })
        .await
    }

    async fn complete_multipart_upload(
        &self,
        upload_id: &UploadId,
        parts: &[CompletedPart],
    ) -> Result<Fingerprint> {
        let upload_id = upload_id.clone();
        let row_id = parse_upload_id(&upload_id)?;
        let parts = parts.to_vec();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let upload: Option<(String, String, String)> = tx
                .query_row(
                    "SELECT namespace, key, content_type FROM multipart_uploads WHERE upload_id = ?1",
                    params![row_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;
            let (namespace, key, content_type) =
                upload.ok_or_else(|| StoreError::UploadNotFound(upload_id.to_string()))?;

            let uploaded: BTreeMap<u32, Bytes> = {
                let mut stmt = tx.prepare(
                    "SELECT part_number, body FROM multipart_parts WHERE upload_id = ?1",
                )?;
                let rows = stmt
                    .query_map(params![row_id], |row| {
                        Ok((row.get::<_, u32>(0)?, Bytes::from(row.get::<_, Vec<u8>>(1)?)))
                    })?
                    .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
                rows
            };

            let assembled = assemble_parts(&upload_id, &uploaded, &parts)?;

            tx.execute(
                "INSERT OR REPLACE INTO objects
                 (namespace, key, etag, content_type, size, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    namespace,
                    key,
                    assembled.fingerprint.as_str(),
                    content_type,
                    assembled.body.len() as i64,
                    assembled.body.as_ref(),
                    now_millis(),
                ],
            )?;
            tx.execute(
                "DELETE FROM multipart_parts WHERE upload_id = ?1",
                params![row_id],
            )?;
            tx.execute(
                "DELETE FROM multipart_uploads WHERE upload_id = ?1",
                params![row_id],
            )?;
            tx.commit()?;

            Ok(assembled.fingerprint)
        })
        .await
    }

    async fn abort_multipart_upload(&self, upload_id: &UploadId) -> Result<()> {
        let upload_id = upload_id.clone();
        let row_id = parse_upload_id(&upload_id)?;

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM multipart_parts WHERE upload_id = ?1",
                params![row_id],
            )?;
            let removed = tx.execute(
                "DELETE FROM multipart_uploads WHERE upload_id = ?1",
                params![row_id],
            )?;
            tx.commit()?;

            if removed == 0 {
                return Err(StoreError::UploadNotFound(upload_id.to_string()));
            }
            Ok(())
        })
        .await
    }
}
