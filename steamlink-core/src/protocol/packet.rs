// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Packet Codec
//!
//! Encodes and decodes the binary wire frames exchanged between the store
//! and the radio nodes, including the nested bridge encapsulation used for
//! multi-hop routing. Relay nodes never look inside a payload; they only
//! add or peel one header layer, so wrap and unwrap must stay exactly
//! symmetric and order-preserving.
//!
//! Frame layouts (little-endian):
//! - control frame: `op:u8, node_id:u32, seq:u16, payload`
//! - data frame:    `op:u8, node_id:u32, seq:u16, stored_rssi:u8, payload`

use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use super::error::ProtocolError;
use super::node_cfg::NodeCfg;
use super::op::SlOp;

/// Maximum radio frame length, including all bridge layers.
pub const SL_MAX_MESSAGE_LEN: usize = 255;

/// Maximum bridge encapsulation depth accepted by the decoder.
///
/// The firmware imposes no bound; without one an adversarial frame could
/// nest arbitrarily, so the store refuses routes longer than this.
pub const MAX_HOPS: usize = 8;

/// Control header size: op + node id + sequence number.
pub const CONTROL_HEADER_LEN: usize = 7;

/// Data header size: control header + stored RSSI byte.
pub const DATA_HEADER_LEN: usize = 8;

/// Decoded packet payload.
///
/// The wire carries raw bytes; this is the best-effort interpretation so
/// downstream code can match explicitly instead of re-guessing: UTF-8 text
/// with trailing NULs stripped, and for the data-delivery ops (`DN`, `DS`)
/// a further JSON parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No payload bytes.
    Empty,
    /// Raw bytes that are not valid UTF-8.
    Bytes(Vec<u8>),
    /// UTF-8 text, trailing NULs stripped.
    Text(String),
    /// Parsed JSON document (only attempted for `DN`/`DS`).
    Json(Value),
}

impl Payload {
    /// Interprets raw payload bytes for the given op.
    pub fn parse(op: SlOp, raw: &[u8]) -> Self {
        if raw.is_empty() {
            return Payload::Empty;
        }
        let trimmed = match raw.iter().rposition(|&b| b != 0) {
            Some(last) => &raw[..=last],
            None => return Payload::Empty,
        };
        let Ok(text) = std::str::from_utf8(trimmed) else {
            return Payload::Bytes(raw.to_vec());
        };
        if matches!(op, SlOp::Dn | SlOp::Ds) {
            if let Ok(json) = serde_json::from_str::<Value>(text) {
                return Payload::Json(json);
            }
        }
        Payload::Text(text.to_string())
    }
}

/// A single unit of wire exchange, either decoded from received bytes or
/// constructed for sending.
///
/// Immutable after construction; `via` is populated while peeling bridge
/// layers during decode.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Operation code of the innermost frame.
    pub op: SlOp,
    /// Originating (or target) node id.
    pub node_id: u32,
    /// Per-node, per-stream sequence number.
    pub seq: u16,
    /// Signal strength of the last hop, in dBm. Zero for control frames.
    pub rssi: i16,
    /// Hops the frame was relayed through, outermost first. Empty if direct.
    pub via: Vec<u32>,
    /// Raw payload bytes of the innermost frame.
    pub raw_payload: Vec<u8>,
    /// Best-effort interpreted payload.
    pub payload: Payload,
    /// Node config carried by `ON` frames, if it parsed.
    pub node_cfg: Option<NodeCfg>,
    /// Unix timestamp the packet was constructed at.
    pub ts: u64,
    /// The complete encoded frame, as received or as it will be sent.
    /// Retransmissions reuse these bytes unchanged.
    pub frame: Vec<u8>,
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet N{}({}){}", self.node_id, self.seq, self.op)
    }
}

impl Packet {
    /// Builds an outgoing packet addressed to `node_id`, encoding the frame
    /// immediately. `via` is the current route to the node; a non-empty
    /// route wraps the frame in one `BN` bridge layer per hop, innermost
    /// layer last, so the outermost frame is addressed to the first hop.
    pub fn outgoing(
        op: SlOp,
        node_id: u32,
        seq: u16,
        rssi: i16,
        payload: &[u8],
        via: &[u32],
        now: u64,
    ) -> Result<Self, ProtocolError> {
        let frame = encode(op, node_id, seq, rssi, payload, via)?;
        Ok(Packet {
            op,
            node_id,
            seq,
            rssi,
            via: via.to_vec(),
            raw_payload: payload.to_vec(),
            payload: Payload::parse(op, payload),
            node_cfg: None,
            ts: now,
            frame,
        })
    }
}

/// Encodes a frame for the wire.
///
/// Odd ops get a data header with the biased RSSI byte, even ops a control
/// header. The bias keeps the (always negative) RSSI in an unsigned byte:
/// `stored = 256 + rssi`.
pub fn encode(
    op: SlOp,
    node_id: u32,
    seq: u16,
    rssi: i16,
    payload: &[u8],
    via: &[u32],
) -> Result<Vec<u8>, ProtocolError> {
    if via.len() > MAX_HOPS {
        return Err(ProtocolError::TooManyHops(MAX_HOPS));
    }

    let mut frame = if op.is_data() {
        let mut buf = Vec::with_capacity(DATA_HEADER_LEN + payload.len());
        push_header(&mut buf, op, node_id, seq);
        buf.push(((256 + i32::from(rssi)) & 0xFF) as u8);
        buf.extend_from_slice(payload);
        buf
    } else {
        let mut buf = Vec::with_capacity(CONTROL_HEADER_LEN + payload.len());
        push_header(&mut buf, op, node_id, seq);
        buf.extend_from_slice(payload);
        buf
    };

    // One bridge layer per hop, reverse order: the first hop ends up outermost.
    for &hop in via.iter().rev() {
        let mut outer = Vec::with_capacity(CONTROL_HEADER_LEN + frame.len());
        push_header(&mut outer, SlOp::Bn, hop, 0);
        outer.extend_from_slice(&frame);
        frame = outer;
    }

    if frame.len() > SL_MAX_MESSAGE_LEN {
        return Err(ProtocolError::FrameTooLong {
            len: frame.len(),
            max: SL_MAX_MESSAGE_LEN,
        });
    }
    Ok(frame)
}

/// Decodes a received frame into a [`Packet`].
///
/// An outer `BS` (or, symmetrically, `BN`) op unwraps one bridge layer per
/// iteration, appending the layer's node id to `via` outer-to-inner. Only
/// the last hop's RSSI is kept; intermediate values are discarded. The
/// remaining bytes are then parsed as a data or control frame by the low
/// bit of the op code.
pub fn decode(bytes: &[u8], now: u64) -> Result<Packet, ProtocolError> {
    let mut rest = bytes;
    let mut via = Vec::new();
    let mut hop_rssi: Option<i16> = None;

    loop {
        let op = peek_op(rest)?;
        if op != SlOp::Bs && op != SlOp::Bn {
            break;
        }
        if via.len() == MAX_HOPS {
            return Err(ProtocolError::TooManyHops(MAX_HOPS));
        }
        let (hop_id, _seq, rssi, payload) = split_frame(rest, op)?;
        via.push(hop_id);
        if op.is_data() {
            hop_rssi = Some(rssi);
        }
        debug!(hop = hop_id, remaining = payload.len(), "unwrapped bridge layer");
        rest = payload;
    }

    let op = peek_op(rest)?;
    let (node_id, seq, frame_rssi, raw_payload) = split_frame(rest, op)?;
    let rssi = if op.is_data() {
        hop_rssi.unwrap_or(frame_rssi)
    } else {
        hop_rssi.unwrap_or(0)
    };

    let node_cfg = if op == SlOp::On {
        match NodeCfg::unpack(raw_payload) {
            Ok(cfg) => Some(cfg),
            Err(err) => {
                // Tolerated: the sign-on still counts, the config stays absent.
                warn!(node_id, %err, "ON payload did not parse as node config");
                None
            }
        }
    } else {
        None
    };

    Ok(Packet {
        op,
        node_id,
        seq,
        rssi,
        via,
        raw_payload: raw_payload.to_vec(),
        payload: Payload::parse(op, raw_payload),
        node_cfg,
        ts: now,
        frame: bytes.to_vec(),
    })
}

fn push_header(buf: &mut Vec<u8>, op: SlOp, node_id: u32, seq: u16) {
    buf.push(op as u8);
    buf.extend_from_slice(&node_id.to_le_bytes());
    buf.extend_from_slice(&seq.to_le_bytes());
}

fn peek_op(bytes: &[u8]) -> Result<SlOp, ProtocolError> {
    let first = bytes.first().ok_or(ProtocolError::FrameTooShort {
        need: CONTROL_HEADER_LEN,
        got: 0,
    })?;
    SlOp::from_u8(*first)
}

/// Splits one frame into (node_id, seq, rssi, payload).
///
/// For control frames the returned rssi is 0.
fn split_frame(bytes: &[u8], op: SlOp) -> Result<(u32, u16, i16, &[u8]), ProtocolError> {
    let header_len = if op.is_data() {
        DATA_HEADER_LEN
    } else {
        CONTROL_HEADER_LEN
    };
    if bytes.len() < header_len {
        return Err(ProtocolError::FrameTooShort {
            need: header_len,
            got: bytes.len(),
        });
    }
    let node_id = u32::from_le_bytes(bytes[1..5].try_into().unwrap());
    let seq = u16::from_le_bytes(bytes[5..7].try_into().unwrap());
    let (rssi, payload) = if op.is_data() {
        (i16::from(bytes[7]) - 256, &bytes[DATA_HEADER_LEN..])
    } else {
        (0, &bytes[CONTROL_HEADER_LEN..])
    };
    Ok((node_id, seq, rssi, payload))
}
