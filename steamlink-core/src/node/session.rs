// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Node Session State Machine
//!
//! One `Node` per radio peer: identity, routing path, liveness state,
//! traffic counters, and the sequence/ack machinery. Packet handlers and
//! the periodic check return effect lists instead of touching the
//! transport or the store directly, so a single owner (the gateway)
//! serializes all side effects.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::protocol::{AckCode, NodeCfg, Packet, ProtocolError, SlOp, MAX_SILENCE_SECS};

use super::ack_wait::{AckTick, AckWaiter, Busy};
use super::sequence::{SeqCheck, SequenceTracker};
use super::state::NodeState;

/// Errors for node-initiated sends.
#[derive(Error, Debug)]
pub enum NodeError {
    /// The node is not in an up state.
    #[error("node is down")]
    NodeDown,

    /// A confirmable exchange is already outstanding.
    #[error(transparent)]
    AckWait(#[from] Busy),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Side effects a node asks its owner to perform.
#[derive(Debug, Clone)]
pub enum NodeEffect {
    /// Publish the packet's frame toward the node's first hop.
    Transmit { packet: Packet, resend: bool },
    /// Persist the packet in the packet table.
    StorePacket(Packet),
    /// Forward a received data payload to the store side of the bus.
    ForwardData { payload: Vec<u8> },
}

/// Per-node traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketCounters {
    pub sent: u64,
    pub received: u64,
    pub resent: u64,
    pub dropped: u64,
    pub missed: u64,
    pub duplicate: u64,
}

/// A test transmission report carried in `TR` payloads, pipe-separated:
/// `lat|lon|node_id|pktno|text`.
#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    pub gps_lat: f64,
    pub gps_lon: f64,
    pub from_node: u32,
    pub pkt_no: u32,
    pub text: String,
    /// Signal strength the report arrived with.
    pub rssi: i16,
}

impl TestReport {
    fn parse(text: &str, rssi: i16) -> Option<Self> {
        let mut parts = text.splitn(5, '|');
        let gps_lat = parts.next()?.parse().ok()?;
        let gps_lon = parts.next()?.parse().ok()?;
        let from_node = parts.next()?.parse().ok()?;
        let pkt_no = parts.next()?.parse().ok()?;
        let text = parts.next()?.to_string();
        Some(TestReport {
            gps_lat,
            gps_lon,
            from_node,
            pkt_no,
            text,
            rssi,
        })
    }
}

/// Persisted snapshot of a node session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: u32,
    pub mesh_id: u32,
    pub name: String,
    pub via: Vec<u32>,
    pub cfg: NodeCfg,
    pub state: NodeState,
    pub counters: PacketCounters,
    pub last_rx: u64,
    pub last_tx: u64,
    pub last_restart: u64,
}

/// A peer session.
#[derive(Debug, Clone)]
pub struct Node {
    id: u32,
    cfg: NodeCfg,
    state: NodeState,
    via: Vec<u32>,
    seq: SequenceTracker,
    ack: AckWaiter,
    counters: PacketCounters,
    last_rx: u64,
    last_tx: u64,
    last_restart: u64,
    /// Last observed RSSI per transmitting node id.
    link_rssi: HashMap<u32, i16>,
    /// Test reports received, keyed by the sending node.
    test_reports: HashMap<u32, Vec<TestReport>>,
}

impl Node {
    /// Creates a session for a node id. Without an announced config a
    /// placeholder one is synthesized from the id.
    pub fn new(node_id: u32, cfg: Option<NodeCfg>) -> Self {
        let cfg = cfg.unwrap_or_else(|| NodeCfg::new(node_id));
        let node = Node {
            id: node_id,
            cfg,
            state: NodeState::Initial,
            via: Vec::new(),
            seq: SequenceTracker::new(),
            ack: AckWaiter::default(),
            counters: PacketCounters::default(),
            last_rx: 0,
            last_tx: 0,
            last_restart: 0,
            link_rssi: HashMap::new(),
            test_reports: HashMap::new(),
        };
        info!(node_id, name = %node.cfg.name, "node created");
        node
    }

    /// Restores a session from its persisted snapshot.
    pub fn from_record(record: NodeRecord) -> Self {
        Node {
            id: record.node_id,
            cfg: record.cfg,
            state: record.state,
            via: record.via,
            seq: SequenceTracker::new(),
            ack: AckWaiter::default(),
            counters: record.counters,
            last_rx: record.last_rx,
            last_tx: record.last_tx,
            last_restart: record.last_restart,
            link_rssi: HashMap::new(),
            test_reports: HashMap::new(),
        }
    }

    /// Snapshot for persistence.
    pub fn record(&self) -> NodeRecord {
        NodeRecord {
            node_id: self.id,
            mesh_id: self.mesh_id(),
            name: self.cfg.name.clone(),
            via: self.via.clone(),
            cfg: self.cfg.clone(),
            state: self.state,
            counters: self.counters,
            last_rx: self.last_rx,
            last_tx: self.last_tx,
            last_restart: self.last_restart,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// The mesh this node belongs to, encoded in the high bits of its id.
    pub fn mesh_id(&self) -> u32 {
        self.id >> 8
    }

    pub fn name(&self) -> &str {
        &self.cfg.name
    }

    pub fn cfg(&self) -> &NodeCfg {
        &self.cfg
    }

    /// Replaces the stored config, e.g. before pushing it with `SC`.
    pub fn set_cfg(&mut self, cfg: NodeCfg) {
        self.cfg = cfg;
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn via(&self) -> &[u32] {
        &self.via
    }

    pub fn counters(&self) -> &PacketCounters {
        &self.counters
    }

    pub fn last_rx(&self) -> u64 {
        self.last_rx
    }

    /// Marks the node heard-from, without a full packet dispatch. Used for
    /// intermediate hops on a via route.
    pub fn mark_heard(&mut self, now: u64) -> Vec<NodeEffect> {
        let mut effects = Vec::new();
        self.last_rx = now;
        if !self.state.is_up() {
            self.set_state(NodeState::Transmitting, now, &mut effects);
        }
        effects
    }

    /// Test reports received from a given node.
    pub fn test_reports(&self, from_node: u32) -> &[TestReport] {
        self.test_reports.get(&from_node).map_or(&[], Vec::as_slice)
    }

    /// Last observed RSSI per transmitting node.
    pub fn link_rssi(&self) -> &HashMap<u32, i16> {
        &self.link_rssi
    }

    pub fn is_offline(&self) -> bool {
        self.state == NodeState::Offline
    }

    /// True once the node has been silent beyond its configured budget.
    pub fn is_overdue(&self, now: u64) -> bool {
        if self.state == NodeState::Offline {
            return false;
        }
        self.last_rx + u64::from(self.cfg.max_silence) <= now
    }

    /// First hop to reach this node: the head of the via route, or the
    /// node itself when direct.
    pub fn first_hop(&self) -> u32 {
        self.via.first().copied().unwrap_or(self.id)
    }

    fn set_state(&mut self, new_state: NodeState, now: u64, effects: &mut Vec<NodeEffect>) {
        let old_state = self.state;
        let was_up = old_state.is_up();
        self.state = new_state;
        let is_up = new_state.is_up();

        if !was_up && is_up {
            info!(node = %self.cfg.name, %old_state, %new_state, "node now up");
        } else if was_up && !is_up {
            info!(node = %self.cfg.name, %old_state, %new_state, "node now down");
        }
        // A node seen transmitting without a sign-on gets asked for status.
        if new_state == NodeState::Transmitting {
            effects.extend(self.send_get_status(now));
        }
    }

    /// Handles one inbound packet, already decoded and addressed to this
    /// node. Returns the side effects for the owner to apply.
    pub fn handle_packet(&mut self, pkt: &Packet, now: u64) -> Vec<NodeEffect> {
        let mut effects = Vec::new();

        if !pkt.op.is_data() {
            // Control-class op arriving through the inbound path.
            warn!(node = %self.cfg.name, %pkt, "got control packet, dropping");
            self.counters.dropped += 1;
            return effects;
        }

        match self.seq.check(pkt.seq) {
            SeqCheck::Duplicate => {
                info!(node = %self.cfg.name, %pkt, "received duplicate packet");
                self.counters.duplicate += 1;
                self.counters.dropped += 1;
                if pkt.op.needs_ack() {
                    // Re-ack idempotently so the peer stops retrying.
                    debug!(op = %pkt.op, "re-sending AN for duplicate");
                    effects.extend(self.send_ack(0, now));
                }
                return effects;
            }
            SeqCheck::Missed(gap) => {
                self.counters.missed += u64::from(gap);
                warn!(node = %self.cfg.name, gap, %pkt, "packets missed");
            }
            SeqCheck::Restarted => {
                debug!(node = %self.cfg.name, "peer restarted its numbering");
            }
            SeqCheck::Fresh => {}
        }

        // Routes are trusted from the freshest packet.
        if self.via != pkt.via {
            if !self.via.is_empty() {
                warn!(node = %self.cfg.name, from = ?self.via, to = ?pkt.via, "routing changed");
            }
            self.via = pkt.via.clone();
        }

        self.counters.received += 1;
        self.link_rssi.insert(pkt.node_id, pkt.rssi);

        match pkt.op {
            SlOp::On => {
                // The peer restarted: any unacked confirmable send is stale.
                self.ack.abandon();
                if let Some(cfg) = &pkt.node_cfg {
                    self.cfg.merge(cfg);
                }
                self.set_state(NodeState::Online, now, &mut effects);
                self.last_restart = now;
                info!(node = %self.cfg.name, node_id = self.id, "signed on");
                // Push the merged config back so the node stores it.
                match self.send_set_config(now) {
                    Ok(more) => effects.extend(more),
                    Err(err) => warn!(node = %self.cfg.name, %err, "config push not sent"),
                }
            }
            SlOp::Of => {
                self.set_state(NodeState::Offline, now, &mut effects);
            }
            SlOp::Ds => {
                effects.push(NodeEffect::StorePacket(pkt.clone()));
                effects.extend(self.send_ack(0, now));
                effects.push(NodeEffect::ForwardData {
                    payload: pkt.raw_payload.clone(),
                });
            }
            SlOp::Ss => match packet_state_text(pkt).parse::<NodeState>() {
                Ok(state) => self.set_state(state, now, &mut effects),
                Err(err) => {
                    warn!(node = %self.cfg.name, state = %err.0, "unknown status snapshot state");
                    self.counters.dropped += 1;
                }
            },
            SlOp::As => {
                let code = pkt.raw_payload.first().copied().map(AckCode::from_u8);
                match code {
                    Some(code) => debug!(node = %self.cfg.name, %code, "ack from peer"),
                    None => debug!(node = %self.cfg.name, "ack from peer without code"),
                }
                if let Some(stashed) = self.ack.acked() {
                    // Durable insert deferred until the round trip confirmed.
                    effects.push(NodeEffect::StorePacket(stashed));
                }
            }
            SlOp::Tr => match TestReport::parse(packet_state_text(pkt), pkt.rssi) {
                Some(report) => {
                    debug!(node = %self.cfg.name, from = report.from_node, pkt_no = report.pkt_no, "test report");
                    self.test_reports
                        .entry(report.from_node)
                        .or_default()
                        .push(report);
                }
                None => {
                    warn!(node = %self.cfg.name, "cannot identify test data");
                    self.counters.dropped += 1;
                }
            },
            other => {
                warn!(node = %self.cfg.name, op = %other, "unexpected op, dropping");
                self.counters.dropped += 1;
            }
        }

        self.last_rx = now;
        // Any packet from the node indicates it is up.
        if !self.is_offline() && !self.state.is_up() {
            self.set_state(NodeState::Transmitting, now, &mut effects);
        }
        effects
    }

    /// One heartbeat tick: ack retry, overdue detection, and a status poll
    /// for nodes that have gone quiet without signing off.
    pub fn periodic_check(&mut self, now: u64) -> Vec<NodeEffect> {
        let mut effects = Vec::new();

        match self.ack.tick(now) {
            AckTick::Idle | AckTick::Waiting => {}
            AckTick::Retry(pkt) => {
                effects.extend(self.transmit(pkt, true, now));
            }
            AckTick::GaveUp => {
                warn!(node = %self.cfg.name, "resend limit reached, giving up");
            }
        }

        if self.is_overdue(now) && self.state.is_up() {
            self.set_state(NodeState::Overdue, now, &mut effects);
        }
        if !self.is_offline()
            && !self.state.is_up()
            && self.last_tx != 0
            && self.last_tx + u64::from(MAX_SILENCE_SECS) < now
        {
            effects.extend(self.send_get_status(now));
        }
        effects
    }

    /// Sends application data to the node (`DN`). Confirmable; the packet
    /// is persisted once the node acks it.
    pub fn send_data(&mut self, data: &[u8], now: u64) -> Result<Vec<NodeEffect>, NodeError> {
        self.confirmable_send(SlOp::Dn, data, true, now)
    }

    /// Pushes the stored config to the node (`SC`). Confirmable.
    pub fn send_set_config(&mut self, now: u64) -> Result<Vec<NodeEffect>, NodeError> {
        let payload = self.cfg.pack();
        self.confirmable_send(SlOp::Sc, &payload, false, now)
    }

    /// Asks the node for a status snapshot (`GS`).
    pub fn send_get_status(&mut self, now: u64) -> Vec<NodeEffect> {
        self.plain_send(SlOp::Gs, &[], now)
    }

    /// Acknowledges the node's last data packet (`AN`).
    pub fn send_ack(&mut self, code: u8, now: u64) -> Vec<NodeEffect> {
        self.plain_send(SlOp::An, &[code], now)
    }

    /// Cold-boots the node (`BC`). No reply expected.
    pub fn send_boot_cold(&mut self, now: u64) -> Vec<NodeEffect> {
        self.plain_send(SlOp::Bc, &[], now)
    }

    /// Sends a test transmission request (`TD`).
    pub fn send_test(&mut self, payload: &[u8], now: u64) -> Result<Vec<NodeEffect>, NodeError> {
        if !self.state.is_up() {
            self.counters.dropped += 1;
            return Err(NodeError::NodeDown);
        }
        Ok(self.plain_send(SlOp::Td, payload, now))
    }

    fn confirmable_send(
        &mut self,
        op: SlOp,
        payload: &[u8],
        persist_on_ack: bool,
        now: u64,
    ) -> Result<Vec<NodeEffect>, NodeError> {
        if !self.state.is_up() {
            self.counters.dropped += 1;
            return Err(NodeError::NodeDown);
        }
        if self.ack.is_waiting() {
            self.counters.dropped += 1;
            return Err(NodeError::AckWait(Busy));
        }
        let packet = self.build(op, payload, now)?;
        let effects = self.transmit(packet.clone(), false, now);
        self.ack.begin(packet, persist_on_ack, now)?;
        Ok(effects)
    }

    fn plain_send(&mut self, op: SlOp, payload: &[u8], now: u64) -> Vec<NodeEffect> {
        match self.build(op, payload, now) {
            Ok(packet) => self.transmit(packet, false, now),
            Err(err) => {
                warn!(node = %self.cfg.name, op = %op, %err, "could not encode frame");
                self.counters.dropped += 1;
                Vec::new()
            }
        }
    }

    fn build(&mut self, op: SlOp, payload: &[u8], now: u64) -> Result<Packet, ProtocolError> {
        let seq = self.seq.assign(op.is_data());
        Packet::outgoing(op, self.id, seq, 0, payload, &self.via, now)
    }

    /// Send discipline: while an ack is outstanding only `AN` may go out,
    /// everything else is dropped and counted.
    fn transmit(&mut self, packet: Packet, resend: bool, now: u64) -> Vec<NodeEffect> {
        if resend {
            debug!(node = %self.cfg.name, %packet, "resending packet");
            self.counters.resent += 1;
        } else if self.ack.is_waiting() && packet.op != SlOp::An {
            warn!(node = %self.cfg.name, %packet, "send attempted while waiting for AS, dropped");
            self.counters.dropped += 1;
            return Vec::new();
        }
        self.counters.sent += 1;
        self.last_tx = now;
        debug!(node = %self.cfg.name, %packet, first_hop = self.first_hop(), frame = %hex::encode(&packet.frame), "publish packet");
        vec![NodeEffect::Transmit { packet, resend }]
    }
}

/// Payload as text for ops whose payload is textual; empty string when it
/// is not.
fn packet_state_text(pkt: &Packet) -> &str {
    match &pkt.payload {
        crate::protocol::Payload::Text(text) => text,
        _ => "",
    }
}
