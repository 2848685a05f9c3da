//! meshid-store — SQLite gallery of enrolled identities.
//!
//! Each row holds a display name and an embedding serialized as a plain JSON
//! numeric array. Embeddings are immutable after registration; only the name
//! can change. [`GalleryStore::list`] is the point-in-time gallery snapshot
//! handed to the matcher.

use chrono::Utc;
use meshid_core::{Embedding, IdentityId, IdentityRecord};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS identities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    embedding TEXT NOT NULL,
    created_at TEXT NOT NULL
);";

const SELECT_IDENTITY: &str = "SELECT id, name, embedding, created_at FROM identities";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored embedding is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to create store directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("identity {0} not found")]
    NotFound(IdentityId),
}

/// Row as stored: (id, name, embedding JSON, created_at).
type RawIdentity = (IdentityId, String, String, String);

/// Persistent gallery backed by a single SQLite connection.
pub struct GalleryStore {
    conn: Connection,
}

impl GalleryStore {
    /// Open (or create) the gallery database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
                path: dir.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        tracing::debug!(path = %path.display(), "gallery store opened");
        Self::init(conn)
    }

    /// Open a throwaway in-memory gallery.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Enroll a new identity.
    pub fn register(&self, name: &str, embedding: &Embedding) -> Result<IdentityRecord, StoreError> {
        let created_at = Utc::now().to_rfc3339();
        let encoded = serde_json::to_string(embedding)?;

        self.conn.execute(
            "INSERT INTO identities (name, embedding, created_at) VALUES (?1, ?2, ?3)",
            params![name, encoded, created_at],
        )?;
        let id = self.conn.last_insert_rowid();

        if embedding.is_degenerate() {
            tracing::warn!(id, name, "registered identity has a degenerate embedding");
        }
        tracing::info!(id, name, dim = embedding.dim(), "identity registered");

        Ok(IdentityRecord {
            id,
            name: name.to_string(),
            embedding: embedding.clone(),
            created_at,
        })
    }

    /// All identities in ascending id order.
    pub fn list(&self) -> Result<Vec<IdentityRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_IDENTITY} ORDER BY id"))?;
        let rows = stmt.query_map([], read_row)?;
        let records = rows
            .map(|row| decode(row?))
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(records)
    }

    pub fn get(&self, id: IdentityId) -> Result<IdentityRecord, StoreError> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_IDENTITY} WHERE id = ?1"),
                params![id],
                read_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))?;
        decode(raw)
    }

    /// Change an identity's display name.
    pub fn rename(&self, id: IdentityId, name: &str) -> Result<IdentityRecord, StoreError> {
        let changed = self.conn.execute(
            "UPDATE identities SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::info!(id, name, "identity renamed");
        self.get(id)
    }

    pub fn remove(&self, id: IdentityId) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM identities WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::info!(id, "identity removed");
        Ok(())
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawIdentity> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode((id, name, embedding, created_at): RawIdentity) -> Result<IdentityRecord, StoreError> {
    Ok(IdentityRecord {
        id,
        name,
        embedding: serde_json::from_str(&embedding)?,
        created_at,
    })
}
