// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Store Trait
//!
//! Keyed-table persistence abstraction the engine writes through. The
//! engine never waits on storage results; a slow backend should buffer
//! and apply `flush` on its own schedule.

use serde_json::Value;
use thiserror::Error;

/// Storage error types.
#[derive(Error, Debug)]
pub enum StoreError {
    #[cfg(feature = "sqlite-store")]
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Keyed-table store for node, mesh, and packet records.
///
/// Records are JSON documents; the engine owns their schema. Implementors
/// only need upsert-by-key semantics per named table.
pub trait Store: Send {
    /// Inserts or replaces the record under `(table, key)`.
    fn upsert(&mut self, table: &str, key: &str, record: &Value) -> Result<(), StoreError>;

    /// Looks up one record by key.
    fn find_one(&self, table: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Returns all records of a table.
    fn find(&self, table: &str) -> Result<Vec<Value>, StoreError>;

    /// Pushes buffered writes out. Called periodically by the scheduler;
    /// an optimization, not a correctness requirement.
    fn flush(&mut self) -> Result<(), StoreError>;
}
