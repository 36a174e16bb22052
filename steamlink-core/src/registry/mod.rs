// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Node, Mesh, and Packet Registry
//!
//! The single authority for node and mesh identity. All mutation of
//! persisted state flows back through the registry's upsert methods so
//! the external store stays consistent; nothing else holds a long-lived
//! alias to a stored record.

mod memory;
#[cfg(feature = "sqlite-store")]
mod sqlite;
mod store;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite-store")]
pub use sqlite::SqliteStore;
pub use store::{Store, StoreError};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::node::{Mesh, Node, NodeRecord};
use crate::protocol::{Packet, Payload};

/// Store table holding node records, keyed by node id.
pub const NODE_TABLE: &str = "nodes";
/// Store table holding mesh records, keyed by mesh id.
pub const MESH_TABLE: &str = "meshes";
/// Store table holding packet records, keyed by timestamp and source.
pub const PACKET_TABLE: &str = "packets";

/// Persisted snapshot of a packet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketRecord {
    /// Two-letter op mnemonic.
    pub op: String,
    pub node_id: u32,
    pub seq: u16,
    pub rssi: i16,
    pub via: Vec<u32>,
    /// Payload as JSON, text, or hex-encoded bytes.
    pub payload: Value,
    pub ts: u64,
}

impl From<&Packet> for PacketRecord {
    fn from(pkt: &Packet) -> Self {
        let payload = match &pkt.payload {
            Payload::Empty => Value::Null,
            Payload::Bytes(bytes) => Value::String(hex::encode(bytes)),
            Payload::Text(text) => Value::String(text.clone()),
            Payload::Json(json) => json.clone(),
        };
        PacketRecord {
            op: pkt.op.code().to_string(),
            node_id: pkt.node_id,
            seq: pkt.seq,
            rssi: pkt.rssi,
            via: pkt.via.clone(),
            payload,
            ts: pkt.ts,
        }
    }
}

/// In-memory node/mesh maps with write-through persistence.
pub struct Registry {
    nodes: HashMap<u32, Node>,
    meshes: HashMap<u32, Mesh>,
    store: Box<dyn Store>,
}

impl Registry {
    /// Creates an empty registry over a store.
    pub fn new(store: Box<dyn Store>) -> Self {
        Registry {
            nodes: HashMap::new(),
            meshes: HashMap::new(),
            store,
        }
    }

    /// Restores node and mesh sessions from the store.
    pub fn load(store: Box<dyn Store>) -> Result<Self, StoreError> {
        let mut registry = Registry::new(store);
        for value in registry.store.find(NODE_TABLE)? {
            match serde_json::from_value::<NodeRecord>(value) {
                Ok(record) => {
                    let node = Node::from_record(record);
                    registry.nodes.insert(node.id(), node);
                }
                Err(err) => warn!(%err, "skipping unreadable node record"),
            }
        }
        for value in registry.store.find(MESH_TABLE)? {
            match serde_json::from_value::<Mesh>(value) {
                Ok(mesh) => {
                    registry.meshes.insert(mesh.mesh_id, mesh);
                }
                Err(err) => warn!(%err, "skipping unreadable mesh record"),
            }
        }
        debug!(
            nodes = registry.nodes.len(),
            meshes = registry.meshes.len(),
            "registry loaded"
        );
        Ok(registry)
    }

    pub fn node(&self, node_id: u32) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub fn node_mut(&mut self, node_id: u32) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Looks a node up by its configured name.
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name() == name)
    }

    pub fn node_ids(&self) -> Vec<u32> {
        self.nodes.keys().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn mesh(&self, mesh_id: u32) -> Option<&Mesh> {
        self.meshes.get(&mesh_id)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Adds a node session, creating its mesh if needed, and persists both.
    pub fn insert_node(&mut self, node: Node) -> Result<(), StoreError> {
        let node_id = node.id();
        let mesh_id = node.mesh_id();
        self.nodes.insert(node_id, node);
        self.ensure_mesh(mesh_id)?;
        self.sync_node(node_id)
    }

    /// Creates the mesh for an id if it does not exist yet.
    pub fn ensure_mesh(&mut self, mesh_id: u32) -> Result<(), StoreError> {
        if !self.meshes.contains_key(&mesh_id) {
            self.meshes.insert(mesh_id, Mesh::new(mesh_id));
            self.sync_mesh(mesh_id)?;
        }
        Ok(())
    }

    /// Adds to a mesh's traffic counters and persists it.
    pub fn bump_mesh(&mut self, mesh_id: u32, sent: u64, received: u64) -> Result<(), StoreError> {
        self.ensure_mesh(mesh_id)?;
        if let Some(mesh) = self.meshes.get_mut(&mesh_id) {
            mesh.packets_sent += sent;
            mesh.packets_received += received;
        }
        self.sync_mesh(mesh_id)
    }

    /// Writes a node's current snapshot back to the store.
    pub fn sync_node(&mut self, node_id: u32) -> Result<(), StoreError> {
        let Some(node) = self.nodes.get(&node_id) else {
            return Ok(());
        };
        let value = serde_json::to_value(node.record())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.upsert(NODE_TABLE, &node_id.to_string(), &value)
    }

    /// Writes a mesh's current snapshot back to the store.
    pub fn sync_mesh(&mut self, mesh_id: u32) -> Result<(), StoreError> {
        let Some(mesh) = self.meshes.get(&mesh_id) else {
            return Ok(());
        };
        let value =
            serde_json::to_value(mesh).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.upsert(MESH_TABLE, &mesh_id.to_string(), &value)
    }

    /// Persists a packet record.
    pub fn insert_packet(&mut self, pkt: &Packet) -> Result<(), StoreError> {
        let record = PacketRecord::from(pkt);
        let key = format!("{}-{}-{}", record.ts, record.node_id, record.seq);
        let value =
            serde_json::to_value(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.upsert(PACKET_TABLE, &key, &value)
    }

    /// Read access to the underlying store, for record queries.
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Flushes the underlying store.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.store.flush()
    }
}
