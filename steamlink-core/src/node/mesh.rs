// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mesh aggregates.

use serde::{Deserialize, Serialize};
use tracing::info;

/// A logical grouping of nodes sharing communication context.
///
/// The mesh id is the high bits of its member node ids. Meshes do not own
/// their nodes; they only accumulate traffic counters. Created lazily the
/// first time a node references the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mesh {
    pub mesh_id: u32,
    pub name: String,
    pub packets_sent: u64,
    pub packets_received: u64,
}

impl Mesh {
    pub fn new(mesh_id: u32) -> Self {
        let mesh = Mesh {
            mesh_id,
            name: format!("Mesh{mesh_id}"),
            packets_sent: 0,
            packets_received: 0,
        };
        info!(mesh_id, name = %mesh.name, "mesh created");
        mesh
    }
}
