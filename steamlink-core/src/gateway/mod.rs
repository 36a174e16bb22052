// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Gateway Service
//!
//! The top-level coordinator: receives encoded frames from the transport,
//! decodes them, resolves the target node session, dispatches, and turns
//! the resulting node effects back into published frames and store writes.
//! The heartbeat drives all time-based transitions.
//!
//! The gateway is the single owner of all node and mesh state: inbound
//! dispatch and the heartbeat both run on the embedder's thread of
//! control, which serializes them.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::node::{Node, NodeEffect, NodeError};
use crate::protocol::{self, NodeCfg, ProtocolError, SlOp};
use crate::registry::{Registry, StoreError};
use crate::transport::{Channel, Destination, Transport, TransportError};

/// Topic carrying admin commands rather than node frames.
pub const STORE_TOPIC: &str = "store";

/// Gateway error types.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("unknown node {0}")]
    UnknownNode(u32),

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("unreadable command: {0}")]
    BadCommand(String),
}

/// Configuration for the gateway service.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Identity string announced on the bus, used by `selfcheck`.
    pub identity: String,
    /// Create a node session on an `ON` frame from an unknown id.
    pub autocreate: bool,
    /// Flush the store every this many heartbeat ticks.
    pub flush_every: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            identity: format!("steamlink-core {}", env!("CARGO_PKG_VERSION")),
            autocreate: false,
            flush_every: 10,
        }
    }
}

impl GatewayConfig {
    /// Config with node auto-creation enabled.
    pub fn with_autocreate() -> Self {
        GatewayConfig {
            autocreate: true,
            ..Default::default()
        }
    }
}

/// Admin commands arriving as JSON on the store topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
enum AdminCommand {
    /// Liveness probe; answered with a pong on the control channel.
    Ping,
    /// Bus loopback check: the gateway publishes its own identity at
    /// startup and verifies the echo.
    Selfcheck { identity: String },
}

/// The per-population protocol engine.
pub struct Gateway<T: Transport> {
    transport: T,
    registry: Registry,
    config: GatewayConfig,
    tick_count: u64,
    bus_checked: bool,
}

impl<T: Transport> Gateway<T> {
    /// Creates the gateway and announces itself on the bus.
    pub fn new(transport: T, registry: Registry, config: GatewayConfig) -> Self {
        let mut gateway = Gateway {
            transport,
            registry,
            config,
            tick_count: 0,
            bus_checked: false,
        };
        gateway.announce();
        gateway
    }

    fn announce(&mut self) {
        let cmd = AdminCommand::Selfcheck {
            identity: self.config.identity.clone(),
        };
        match serde_json::to_vec(&cmd) {
            Ok(bytes) => {
                if let Err(err) = self.transport.publish(Destination::Store, &bytes, Channel::Data)
                {
                    warn!(%err, "could not announce on the bus");
                }
            }
            Err(err) => warn!(%err, "could not serialize selfcheck"),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// True once the startup selfcheck came back around the bus.
    pub fn bus_checked(&self) -> bool {
        self.bus_checked
    }

    /// Entry point for everything the transport delivers.
    ///
    /// Messages on the store topic are JSON admin commands; everything
    /// else is a node frame. Malformed input is logged and dropped, never
    /// fatal.
    pub fn on_transport_message(&mut self, topic: &str, payload: &[u8], now: u64) {
        if topic == STORE_TOPIC {
            if let Err(err) = self.handle_admin(payload) {
                warn!(%err, "store command dropped");
            }
            return;
        }
        if let Err(err) = self.dispatch_frame(payload, now) {
            warn!(topic, %err, "packet dropped");
        }
    }

    fn handle_admin(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        let cmd: AdminCommand = serde_json::from_slice(payload)
            .map_err(|e| GatewayError::BadCommand(e.to_string()))?;
        debug!(?cmd, "store command");
        match cmd {
            AdminCommand::Ping => {
                let response = format!("pong '{}'", self.config.identity);
                self.transport
                    .publish(Destination::Store, response.as_bytes(), Channel::Control)?;
            }
            AdminCommand::Selfcheck { identity } => {
                if identity == self.config.identity {
                    debug!("bus selfcheck successful");
                    self.bus_checked = true;
                } else {
                    warn!(%identity, "there is another system on this bus");
                }
            }
        }
        Ok(())
    }

    fn dispatch_frame(&mut self, bytes: &[u8], now: u64) -> Result<(), GatewayError> {
        let pkt = protocol::decode(bytes, now)?;
        debug!(%pkt, via = ?pkt.via, "received");

        if self.registry.node(pkt.node_id).is_none() {
            if self.config.autocreate && pkt.op == SlOp::On {
                let node = Node::new(pkt.node_id, pkt.node_cfg.clone());
                self.registry.insert_node(node)?;
            } else {
                return Err(GatewayError::UnknownNode(pkt.node_id));
            }
        }

        // Every hop on the via route was heard from too.
        for &hop in &pkt.via {
            match self.registry.node_mut(hop) {
                Some(node) => {
                    let effects = node.mark_heard(now);
                    self.apply_effects(hop, effects)?;
                    self.registry.sync_node(hop)?;
                }
                None => warn!(hop, "via node not on file"),
            }
        }

        let mesh_id;
        let effects;
        match self.registry.node_mut(pkt.node_id) {
            Some(node) => {
                mesh_id = node.mesh_id();
                effects = node.handle_packet(&pkt, now);
            }
            None => return Err(GatewayError::UnknownNode(pkt.node_id)),
        }
        self.registry.bump_mesh(mesh_id, 0, 1)?;
        self.apply_effects(pkt.node_id, effects)?;
        self.registry.sync_node(pkt.node_id)?;
        Ok(())
    }

    /// Sends application data to a node (`DN`), as issued by a dashboard
    /// or other control plane.
    pub fn send_data_to_node(
        &mut self,
        node_id: u32,
        data: &[u8],
        now: u64,
    ) -> Result<(), GatewayError> {
        let effects = self
            .registry
            .node_mut(node_id)
            .ok_or(GatewayError::UnknownNode(node_id))?
            .send_data(data, now)?;
        self.apply_effects(node_id, effects)?;
        self.registry.sync_node(node_id)?;
        Ok(())
    }

    /// Replaces a node's config and pushes it with `SC`.
    pub fn push_node_config(
        &mut self,
        node_id: u32,
        cfg: NodeCfg,
        now: u64,
    ) -> Result<(), GatewayError> {
        let node = self
            .registry
            .node_mut(node_id)
            .ok_or(GatewayError::UnknownNode(node_id))?;
        node.set_cfg(cfg);
        let effects = node.send_set_config(now)?;
        self.apply_effects(node_id, effects)?;
        self.registry.sync_node(node_id)?;
        Ok(())
    }

    /// One heartbeat tick, to be driven once a second.
    ///
    /// Runs every node's periodic check (ack retry, overdue detection,
    /// status polls) and flushes the store on a longer period.
    pub fn heartbeat(&mut self, now: u64) {
        self.tick_count += 1;
        for node_id in self.registry.node_ids() {
            let Some(node) = self.registry.node_mut(node_id) else {
                continue;
            };
            let effects = node.periodic_check(now);
            if effects.is_empty() && !node.state().is_up() {
                continue;
            }
            if let Err(err) = self.apply_effects(node_id, effects) {
                warn!(node_id, %err, "heartbeat effects failed");
            }
            if let Err(err) = self.registry.sync_node(node_id) {
                warn!(node_id, %err, "node snapshot not persisted");
            }
        }
        if self.tick_count % self.config.flush_every == 0 {
            if let Err(err) = self.registry.flush() {
                warn!(%err, "store flush failed");
            }
        }
    }

    fn apply_effects(
        &mut self,
        node_id: u32,
        effects: Vec<NodeEffect>,
    ) -> Result<(), GatewayError> {
        for effect in effects {
            match effect {
                NodeEffect::Transmit { packet, resend } => {
                    let first_hop = self
                        .registry
                        .node(node_id)
                        .map_or(node_id, Node::first_hop);
                    if resend {
                        info!(node_id, %packet, "retransmitting");
                    }
                    self.transport.publish(
                        Destination::Node(first_hop),
                        &packet.frame,
                        Channel::Control,
                    )?;
                    let mesh_id = node_id >> 8;
                    self.registry.bump_mesh(mesh_id, 1, 0)?;
                }
                NodeEffect::StorePacket(pkt) => {
                    self.registry.insert_packet(&pkt)?;
                }
                NodeEffect::ForwardData { payload } => {
                    self.transport
                        .publish(Destination::Store, &payload, Channel::Data)?;
                }
            }
        }
        Ok(())
    }
}
