use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageError;

/// Where a store keeps its serialized state between runs.
pub trait SessionPersistence: Send + Sync {
    fn load(&self, bucket: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, bucket: &str, payload: &str) -> Result<(), StorageError>;
}

pub fn default_db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("com", "example", "Contactbook")?;
    Some(proj.data_dir().join("session.sqlite"))
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Named JSON buckets in a single SQLite table.
pub struct SqliteSessionStorage {
    conn: Mutex<Connection>,
}

impl SqliteSessionStorage {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        ensure_dir(path)?;
        Self::init(Connection::open(path)?)
    }

    pub fn open_default() -> Result<Self, StorageError> {
        let path = default_db_path().ok_or(StorageError::NoDataDir)?;
        Self::open(&path)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS session_buckets (
                name TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl SessionPersistence for SqliteSessionStorage {
    fn load(&self, bucket: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let payload = conn
            .query_row(
                "SELECT payload FROM session_buckets WHERE name = ?1",
                params![bucket],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn save(&self, bucket: &str, payload: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute(
            r#"
            INSERT INTO session_buckets (name, payload, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                payload=excluded.payload,
                updated_at=excluded.updated_at
            "#,
            params![bucket, payload, Utc::now()],
        )?;
        Ok(())
    }
}
