// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Node Session Tests
//!
//! Drives one node session through the protocol exchanges a live mesh
//! produces: sign-on, confirmable sends, acknowledgments, duplicates,
//! retries, and liveness transitions.

use steamlink_core::{
    decode, encode, Node, NodeCfg, NodeEffect, NodeError, NodeState, Packet, SlOp, ACK_WAIT_SECS,
    MAX_RESEND_COUNT,
};

const NODE_ID: u32 = 0x0104;

/// Builds an inbound packet the way the gateway sees it: encoded to the
/// wire and decoded back.
fn inbound(op: SlOp, seq: u16, payload: &[u8], now: u64) -> Packet {
    let frame = encode(op, NODE_ID, seq, -70, payload, &[]).unwrap();
    decode(&frame, now).unwrap()
}

fn sign_on_payload() -> Vec<u8> {
    let mut cfg = NodeCfg::new(NODE_ID);
    cfg.name = "pump1".into();
    cfg.pack()
}

/// Brings a fresh node online and clears the config-push ack, leaving it
/// idle and up. Returns the node and the next inbound sequence number.
fn online_node(now: u64) -> (Node, u16) {
    let mut node = Node::new(NODE_ID, None);
    node.handle_packet(&inbound(SlOp::On, 1, &sign_on_payload(), now), now);
    node.handle_packet(&inbound(SlOp::As, 2, &[0], now), now);
    (node, 3)
}

fn transmits(effects: &[NodeEffect]) -> Vec<&Packet> {
    effects
        .iter()
        .filter_map(|e| match e {
            NodeEffect::Transmit { packet, .. } => Some(packet),
            _ => None,
        })
        .collect()
}

#[test]
fn test_sign_on_brings_node_online_and_pushes_config() {
    let mut node = Node::new(NODE_ID, None);
    assert_eq!(node.state(), NodeState::Initial);

    let effects = node.handle_packet(&inbound(SlOp::On, 1, &sign_on_payload(), 1000), 1000);

    assert_eq!(node.state(), NodeState::Online);
    assert_eq!(node.name(), "pump1");
    let sent = transmits(&effects);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].op, SlOp::Sc);
    // The pushed config is the merged record, packed for the node's flash.
    assert_eq!(sent[0].raw_payload, node.cfg().pack());
}

#[test]
fn test_ack_releases_the_confirmable_slot() {
    let (mut node, _seq) = online_node(1000);

    // With the SC acked the next confirmable send must go through.
    let effects = node.send_data(b"{\"relay\":1}", 1001).unwrap();
    let sent = transmits(&effects);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].op, SlOp::Dn);
}

#[test]
fn test_second_confirmable_send_is_refused_while_waiting() {
    let mut node = Node::new(NODE_ID, None);
    // Sign-on leaves the config push awaiting its AS.
    node.handle_packet(&inbound(SlOp::On, 1, &sign_on_payload(), 1000), 1000);

    let err = node.send_data(b"x", 1001).unwrap_err();
    assert!(matches!(err, NodeError::AckWait(_)));
    assert_eq!(node.counters().dropped, 1);
}

#[test]
fn test_send_to_down_node_is_refused() {
    let mut node = Node::new(NODE_ID, None);
    assert!(matches!(node.send_data(b"x", 0), Err(NodeError::NodeDown)));
    assert!(matches!(node.send_test(b"t", 0), Err(NodeError::NodeDown)));
}

#[test]
fn test_data_to_store_is_stored_acked_and_forwarded() {
    let (mut node, seq) = online_node(1000);
    let effects = node.handle_packet(&inbound(SlOp::Ds, seq, b"{\"t\":21.5}", 1010), 1010);

    assert!(effects
        .iter()
        .any(|e| matches!(e, NodeEffect::StorePacket(p) if p.op == SlOp::Ds)));
    assert!(effects
        .iter()
        .any(|e| matches!(e, NodeEffect::ForwardData { payload } if payload == b"{\"t\":21.5}")));
    let sent = transmits(&effects);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].op, SlOp::An);
    assert_eq!(sent[0].raw_payload, [0]);
}

#[test]
fn test_duplicate_data_is_dropped_but_reacked() {
    let (mut node, seq) = online_node(1000);
    node.handle_packet(&inbound(SlOp::Ds, seq, b"r1", 1010), 1010);
    let received = node.counters().received;

    let effects = node.handle_packet(&inbound(SlOp::Ds, seq, b"r1", 1011), 1011);

    // Not stored or forwarded again, but the peer still gets its AN so it
    // stops retrying.
    assert!(!effects
        .iter()
        .any(|e| matches!(e, NodeEffect::StorePacket(_) | NodeEffect::ForwardData { .. })));
    let sent = transmits(&effects);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].op, SlOp::An);
    assert_eq!(node.counters().received, received);
    assert_eq!(node.counters().duplicate, 1);
}

#[test]
fn test_sequence_gap_is_counted_as_missed() {
    let (mut node, seq) = online_node(1000);
    node.handle_packet(&inbound(SlOp::Ds, seq, b"a", 1010), 1010);
    // Two packets lost in between.
    node.handle_packet(&inbound(SlOp::Ds, seq + 3, b"b", 1011), 1011);
    assert_eq!(node.counters().missed, 2);
}

#[test]
fn test_status_snapshot_sets_reported_state() {
    let (mut node, seq) = online_node(1000);
    node.handle_packet(&inbound(SlOp::Ss, seq, b"OK", 1010), 1010);
    assert_eq!(node.state(), NodeState::Ok);
}

#[test]
fn test_sign_off_takes_node_down() {
    let (mut node, seq) = online_node(1000);
    node.handle_packet(&inbound(SlOp::Of, seq, b"", 1010), 1010);
    assert_eq!(node.state(), NodeState::Offline);
    assert!(matches!(node.send_data(b"x", 1011), Err(NodeError::NodeDown)));
}

#[test]
fn test_control_class_op_on_inbound_path_is_dropped() {
    let (mut node, _seq) = online_node(1000);
    let pkt = Packet::outgoing(SlOp::Gs, NODE_ID, 9, 0, b"", &[], 1010).unwrap();
    let effects = node.handle_packet(&pkt, 1010);
    assert!(effects.is_empty());
    assert_eq!(node.counters().dropped, 1);
}

#[test]
fn test_unacked_send_is_retried_then_abandoned() {
    let mut node = Node::new(NODE_ID, None);
    // Sign-on arms the SC ack wait; the AS never arrives.
    node.handle_packet(&inbound(SlOp::On, 1, &sign_on_payload(), 1000), 1000);
    let frame = {
        let mut probe = node.clone();
        let effects = probe.periodic_check(1000 + ACK_WAIT_SECS);
        transmits(&effects)[0].frame.clone()
    };

    let mut now = 1000;
    for _ in 0..MAX_RESEND_COUNT {
        now += ACK_WAIT_SECS + 1;
        let effects = node.periodic_check(now);
        let sent = transmits(&effects);
        assert_eq!(sent.len(), 1);
        // Retransmissions reuse the encoded frame unchanged.
        assert_eq!(sent[0].frame, frame);
    }
    assert_eq!(node.counters().resent, u64::from(MAX_RESEND_COUNT));

    // The next deadline gives up instead of retrying again.
    now += ACK_WAIT_SECS + 1;
    let effects = node.periodic_check(now);
    assert!(transmits(&effects).is_empty());
}

#[test]
fn test_peer_restart_abandons_the_stale_exchange() {
    let mut node = Node::new(NODE_ID, None);
    node.handle_packet(&inbound(SlOp::On, 7, &sign_on_payload(), 1000), 1000);

    // A sign-on restarting the numbering means the firmware rebooted and
    // forgot the exchange; the fresh config push must not be refused as busy.
    let effects = node.handle_packet(&inbound(SlOp::On, 1, &sign_on_payload(), 1100), 1100);
    let sent = transmits(&effects);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].op, SlOp::Sc);
}

#[test]
fn test_silent_node_goes_overdue() {
    let (mut node, _seq) = online_node(1000);
    let silence = u64::from(node.cfg().max_silence);

    assert!(node.periodic_check(1000 + silence - 1).is_empty());
    assert!(node.state().is_up());

    node.periodic_check(1000 + silence);
    assert_eq!(node.state(), NodeState::Overdue);
}

#[test]
fn test_bridged_packet_installs_the_via_route() {
    let (mut node, seq) = online_node(1000);

    // Simulate what decode produces for a two-hop inbound frame.
    let mut pkt = inbound(SlOp::Ds, seq, b"r", 1010);
    pkt.via = vec![0x0105, 0x0106];
    node.handle_packet(&pkt, 1010);

    assert_eq!(node.via(), [0x0105, 0x0106]);
    assert_eq!(node.first_hop(), 0x0105);
}

#[test]
fn test_test_report_is_recorded() {
    let (mut node, seq) = online_node(1000);
    let effects = node.handle_packet(&inbound(SlOp::Tr, seq, b"47.37|8.54|260|12|radio test", 1010), 1010);

    assert!(transmits(&effects).is_empty());
    let reports = node.test_reports(260);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].pkt_no, 12);
    assert_eq!(reports[0].text, "radio test");
    assert_eq!(reports[0].rssi, -70);
}

#[test]
fn test_record_round_trip_preserves_session_identity() {
    let (mut node, seq) = online_node(1000);
    let mut pkt = inbound(SlOp::Ds, seq, b"r", 1010);
    pkt.via = vec![0x0105];
    node.handle_packet(&pkt, 1010);

    let restored = Node::from_record(node.record());
    assert_eq!(restored.id(), node.id());
    assert_eq!(restored.name(), node.name());
    assert_eq!(restored.state(), node.state());
    assert_eq!(restored.via(), node.via());
    assert_eq!(restored.counters(), node.counters());
}
