use log::info;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::storage::{AddressRegistry, FileDirectory};
use crate::utils::{P2PError, Result};

/// Durable backing store for the index server.
///
/// One SQLite connection shared by every connection task; the mutex around it is the only
/// serialization point between concurrent requests.
#[derive(Clone)]
pub struct IndexStore {
    conn: Arc<Mutex<Connection>>,
}

impl IndexStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            P2PError::StoreError(format!("Failed to open database {:?}: {}", path, e))
        })?;
        info!("Opened index database at {:?}", path);
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        create_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn registry(&self) -> AddressRegistry {
        AddressRegistry::new(self.conn.clone())
    }

    pub fn directory(&self) -> FileDirectory {
        FileDirectory::new(self.conn.clone())
    }
}

/// Creates both tables if they are absent. Safe to run on every start.
pub(crate) fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS clients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT UNIQUE
        );

        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            client_id INTEGER REFERENCES clients(id),
            file_name TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_files_name ON files(file_name);
        ",
    )
    .map_err(|e| P2PError::StoreError(format!("Failed to create schema: {}", e)))
}

pub(crate) fn lock(conn: &Mutex<Connection>) -> Result<std::sync::MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| P2PError::StoreError(format!("Store lock poisoned: {}", e)))
}

pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
