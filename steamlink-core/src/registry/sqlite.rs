// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! SQLite-backed store for gateway hosts with local persistence.

use std::path::Path;

use rusqlite::{params, Connection};
use serde_json::Value;
use tracing::debug;

use super::store::{Store, StoreError};

/// A [`Store`] persisting records as JSON rows in a single SQLite table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Opens a transient in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                 tbl  TEXT NOT NULL,
                 key  TEXT NOT NULL,
                 json TEXT NOT NULL,
                 PRIMARY KEY (tbl, key)
             )",
            [],
        )?;
        Ok(SqliteStore { conn })
    }
}

impl Store for SqliteStore {
    fn upsert(&mut self, table: &str, key: &str, record: &Value) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO records (tbl, key, json) VALUES (?1, ?2, ?3)
             ON CONFLICT (tbl, key) DO UPDATE SET json = excluded.json",
            params![table, key, json],
        )?;
        Ok(())
    }

    fn find_one(&self, table: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT json FROM records WHERE tbl = ?1 AND key = ?2")?;
        let mut rows = stmt.query(params![table, key])?;
        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                serde_json::from_str(&json)
                    .map(Some)
                    .map_err(|e| StoreError::Serialization(e.to_string()))
            }
            None => Ok(None),
        }
    }

    fn find(&self, table: &str) -> Result<Vec<Value>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT json FROM records WHERE tbl = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![table], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            let json = row?;
            let value = serde_json::from_str(&json)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            records.push(value);
        }
        Ok(records)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        debug!("flushing sqlite store");
        self.conn.cache_flush()?;
        Ok(())
    }
}
