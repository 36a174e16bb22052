// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory store, for tests and embedders without local persistence.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use super::store::{Store, StoreError};

/// A [`Store`] keeping everything in maps. Key order within a table is
/// lexicographic, which keeps `find` output stable for assertions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Number of records in a table.
    pub fn len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

impl Store for MemoryStore {
    fn upsert(&mut self, table: &str, key: &str, record: &Value) -> Result<(), StoreError> {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    fn find_one(&self, table: &str, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.tables.get(table).and_then(|t| t.get(key)).cloned())
    }

    fn find(&self, table: &str) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
