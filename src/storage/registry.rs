use log::debug;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::storage::database::{is_constraint_violation, lock};
use crate::utils::{P2PError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: i64,
    pub address: String,
}

/// Peer address -> client id. Records are never updated or removed.
#[derive(Clone)]
pub struct AddressRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl AddressRegistry {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn register(&self, address: &str) -> Result<i64> {
        let conn = lock(&self.conn)?;
        match conn.execute(
            "INSERT INTO clients (address) VALUES (?1)",
            rusqlite::params![address],
        ) {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                debug!("Registered client {} as id {}", address, id);
                Ok(id)
            }
            Err(e) if is_constraint_violation(&e) => {
                Err(P2PError::DuplicateRegistration(address.to_string()))
            }
            Err(e) => Err(P2PError::StoreError(e.to_string())),
        }
    }

    pub fn lookup(&self, address: &str) -> Result<i64> {
        let conn = lock(&self.conn)?;
        let result = conn.query_row(
            "SELECT id FROM clients WHERE address = ?1",
            rusqlite::params![address],
            |row| row.get(0),
        );
        match result {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(P2PError::RecordNotFound(address.to_string()))
            }
            Err(e) => Err(P2PError::StoreError(e.to_string())),
        }
    }

    pub fn list(&self) -> Result<Vec<ClientRecord>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT id, address FROM clients ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(ClientRecord {
                id: row.get(0)?,
                address: row.get(1)?,
            })
        })?;

        let mut clients = Vec::new();
        for row in rows {
            clients.push(row?);
        }
        Ok(clients)
    }
}
