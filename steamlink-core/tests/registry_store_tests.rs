// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Registry and Store Tests
//!
//! Persistence round trips: store backends, write-through registry
//! snapshots, and session restoration across a restart.

use serde_json::json;

use steamlink_core::{
    decode, encode, MemoryStore, Node, NodeState, PacketRecord, Registry, SlOp, Store, MESH_TABLE,
    NODE_TABLE, PACKET_TABLE,
};

#[test]
fn test_memory_store_upsert_replaces_by_key() {
    let mut store = MemoryStore::new();
    store.upsert("t", "k", &json!({"v": 1})).unwrap();
    store.upsert("t", "k", &json!({"v": 2})).unwrap();

    assert_eq!(store.len("t"), 1);
    assert_eq!(store.find_one("t", "k").unwrap(), Some(json!({"v": 2})));
    assert_eq!(store.find_one("t", "other").unwrap(), None);
    assert!(store.find("empty").unwrap().is_empty());
}

#[test]
fn test_registry_writes_node_and_mesh_snapshots_through() {
    let mut registry = Registry::new(Box::new(MemoryStore::new()));
    registry.insert_node(Node::new(0x0104, None)).unwrap();

    let node_rec = registry
        .store()
        .find_one(NODE_TABLE, "260")
        .unwrap()
        .expect("node snapshot");
    assert_eq!(node_rec["node_id"], 260);
    assert_eq!(node_rec["mesh_id"], 1);
    assert_eq!(node_rec["state"], "Initial");

    let mesh_rec = registry
        .store()
        .find_one(MESH_TABLE, "1")
        .unwrap()
        .expect("mesh snapshot");
    assert_eq!(mesh_rec["mesh_id"], 1);
}

#[test]
fn test_mesh_counters_persist() {
    let mut registry = Registry::new(Box::new(MemoryStore::new()));
    registry.bump_mesh(1, 2, 5).unwrap();
    registry.bump_mesh(1, 1, 0).unwrap();

    let rec = registry.store().find_one(MESH_TABLE, "1").unwrap().unwrap();
    assert_eq!(rec["packets_sent"], 3);
    assert_eq!(rec["packets_received"], 5);
}

#[test]
fn test_packet_record_captures_the_decoded_payload() {
    let frame = encode(SlOp::Ds, 260, 9, -61, br#"{"t":21.5}"#, &[]).unwrap();
    let pkt = decode(&frame, 1700000000).unwrap();

    let record = PacketRecord::from(&pkt);
    assert_eq!(record.op, "DS");
    assert_eq!(record.node_id, 260);
    assert_eq!(record.seq, 9);
    assert_eq!(record.rssi, -61);
    assert_eq!(record.payload["t"], 21.5);
    assert_eq!(record.ts, 1700000000);
}

#[test]
fn test_packets_are_keyed_by_time_and_source() {
    let mut registry = Registry::new(Box::new(MemoryStore::new()));
    let frame = encode(SlOp::Ds, 260, 9, -61, b"r", &[]).unwrap();
    let pkt = decode(&frame, 1700000000).unwrap();
    registry.insert_packet(&pkt).unwrap();

    let found = registry
        .store()
        .find_one(PACKET_TABLE, "1700000000-260-9")
        .unwrap();
    assert!(found.is_some());
}

#[test]
fn test_load_skips_unreadable_records() {
    let mut store = MemoryStore::new();
    store.upsert(NODE_TABLE, "junk", &json!("not a node")).unwrap();
    let registry = Registry::load(Box::new(store)).unwrap();
    assert_eq!(registry.node_count(), 0);
}

#[test]
fn test_node_lookup_by_name() {
    let mut registry = Registry::new(Box::new(MemoryStore::new()));
    registry.insert_node(Node::new(0x0104, None)).unwrap();
    let node = registry.node_by_name("Node00000104").expect("by name");
    assert_eq!(node.id(), 0x0104);
    assert!(registry.node_by_name("nobody").is_none());
}

#[cfg(feature = "sqlite-store")]
mod sqlite {
    use super::*;
    use steamlink_core::SqliteStore;

    #[test]
    fn test_sqlite_store_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.upsert("t", "k", &json!({"v": 1})).unwrap();
        store.upsert("t", "k", &json!({"v": 2})).unwrap();
        store.upsert("t", "k2", &json!({"v": 3})).unwrap();

        assert_eq!(store.find_one("t", "k").unwrap(), Some(json!({"v": 2})));
        assert_eq!(store.find("t").unwrap().len(), 2);
        store.flush().unwrap();
    }

    #[test]
    fn test_registry_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steamlink.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            let mut registry = Registry::new(Box::new(store));
            registry.insert_node(Node::new(0x0104, None)).unwrap();
            registry.bump_mesh(1, 4, 7).unwrap();
            registry.flush().unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let registry = Registry::load(Box::new(store)).unwrap();
        assert_eq!(registry.node_count(), 1);
        let node = registry.node(0x0104).expect("restored node");
        assert_eq!(node.state(), NodeState::Initial);
        assert_eq!(node.mesh_id(), 1);
        let mesh = registry.mesh(1).expect("restored mesh");
        assert_eq!(mesh.packets_sent, 4);
        assert_eq!(mesh.packets_received, 7);
    }
}
