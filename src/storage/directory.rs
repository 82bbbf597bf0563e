use log::debug;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::storage::database::{is_constraint_violation, lock};
use crate::utils::{P2PError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    /// Id of the owning `ClientRecord`.
    pub owner: i64,
    pub name: String,
}

/// File name -> owning client. Names are not unique; several peers may publish the same one.
#[derive(Clone)]
pub struct FileDirectory {
    conn: Arc<Mutex<Connection>>,
}

impl FileDirectory {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn publish(&self, owner: i64, name: &str) -> Result<FileRecord> {
        let conn = lock(&self.conn)?;
        match conn.execute(
            "INSERT INTO files (client_id, file_name) VALUES (?1, ?2)",
            rusqlite::params![owner, name],
        ) {
            Ok(_) => {
                let record = FileRecord {
                    id: conn.last_insert_rowid(),
                    owner,
                    name: name.to_string(),
                };
                debug!("Published {} for client {}", name, owner);
                Ok(record)
            }
            Err(e) if is_constraint_violation(&e) => {
                Err(P2PError::UnknownOwner(format!("client id {}", owner)))
            }
            Err(e) => Err(P2PError::StoreError(e.to_string())),
        }
    }

    /// Address of a peer that published `name`. With several matches the first row wins.
    pub fn find(&self, name: &str) -> Result<String> {
        let conn = lock(&self.conn)?;
        let result = conn.query_row(
            "SELECT clients.address
             FROM files
             JOIN clients ON files.client_id = clients.id
             WHERE files.file_name = ?1
             LIMIT 1",
            rusqlite::params![name],
            |row| row.get(0),
        );
        match result {
            Ok(address) => Ok(address),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(P2PError::RecordNotFound(name.to_string()))
            }
            Err(e) => Err(P2PError::StoreError(e.to_string())),
        }
    }

    pub fn list(&self) -> Result<Vec<FileRecord>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT id, client_id, file_name FROM files ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(FileRecord {
                id: row.get(0)?,
                owner: row.get(1)?,
                name: row.get(2)?,
            })
        })?;

        let mut files = Vec::new();
        for row in rows {
            files.push(row?);
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::IndexStore;
    use crate::utils::P2PError;

    #[test]
    fn test_publish_and_find() {
        let store = IndexStore::open_in_memory().unwrap();
        let owner = store.registry().register("127.0.0.1:9001").unwrap();

        let record = store.directory().publish(owner, "report").unwrap();
        assert_eq!(record.owner, owner);
        assert_eq!(record.name, "report");

        assert_eq!(store.directory().find("report").unwrap(), "127.0.0.1:9001");
    }

    #[test]
    fn test_publish_unknown_owner() {
        let store = IndexStore::open_in_memory().unwrap();
        let err = store.directory().publish(42, "report").unwrap_err();
        assert!(matches!(err, P2PError::UnknownOwner(_)));
        assert!(store.directory().list().unwrap().is_empty());
    }

    #[test]
    fn test_find_missing() {
        let store = IndexStore::open_in_memory().unwrap();
        assert!(matches!(
            store.directory().find("ghost").unwrap_err(),
            P2PError::RecordNotFound(_)
        ));
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let store = IndexStore::open_in_memory().unwrap();
        let a = store.registry().register("127.0.0.1:9001").unwrap();
        let b = store.registry().register("127.0.0.1:9002").unwrap();

        store.directory().publish(a, "shared").unwrap();
        store.directory().publish(b, "shared").unwrap();

        assert_eq!(store.directory().list().unwrap().len(), 2);
        let found = store.directory().find("shared").unwrap();
        assert!(found == "127.0.0.1:9001" || found == "127.0.0.1:9002");
    }
}
