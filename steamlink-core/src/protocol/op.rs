// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Protocol Operation Codes
//!
//! Every frame on the wire starts with one of these codes. The least
//! significant bit classifies the frame: even codes are control messages
//! (store to node), odd codes are data messages (node to store), and the
//! class decides the header layout.

use std::fmt;

use super::error::ProtocolError;

/// Protocol operation code.
///
/// Mirrors the `SL_OP` table in the node firmware. The numeric values are
/// fixed by the radio protocol and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SlOp {
    /// Data to node, acknowledged with `AS`.
    Dn = 0x30,
    /// Bridge forward to node; payload is a nested frame.
    Bn = 0x32,
    /// Get status, node replies with `SS`.
    Gs = 0x34,
    /// Transmit a test message via radio.
    Td = 0x36,
    /// Set node configuration, acknowledged with `AS`.
    Sc = 0x38,
    /// Cold-boot the node, no reply.
    Bc = 0x3A,
    /// Reset the radio.
    Br = 0x3C,
    /// Ack from store to node.
    An = 0x3E,

    /// Data to store.
    Ds = 0x31,
    /// Bridge to store; payload is a nested frame.
    Bs = 0x33,
    /// Node going online, payload carries its config.
    On = 0x35,
    /// Ack from node for the last control message.
    As = 0x37,
    /// Node going offline.
    Of = 0x39,
    /// Received test data report.
    Tr = 0x3B,
    /// Status info and counters.
    Ss = 0x3D,
    /// No connection or timeout. Local sentinel, never on the wire.
    Nc = 0x3F,
}

impl SlOp {
    /// Decodes an op code from its wire byte.
    pub fn from_u8(byte: u8) -> Result<Self, ProtocolError> {
        let op = match byte {
            0x30 => SlOp::Dn,
            0x32 => SlOp::Bn,
            0x34 => SlOp::Gs,
            0x36 => SlOp::Td,
            0x38 => SlOp::Sc,
            0x3A => SlOp::Bc,
            0x3C => SlOp::Br,
            0x3E => SlOp::An,
            0x31 => SlOp::Ds,
            0x33 => SlOp::Bs,
            0x35 => SlOp::On,
            0x37 => SlOp::As,
            0x39 => SlOp::Of,
            0x3B => SlOp::Tr,
            0x3D => SlOp::Ss,
            0x3F => SlOp::Nc,
            other => return Err(ProtocolError::UnknownOp(other)),
        };
        Ok(op)
    }

    /// Returns true for data-class ops (odd codes, node to store).
    ///
    /// Data frames carry an RSSI byte in the header; control frames do not.
    pub fn is_data(self) -> bool {
        (self as u8) & 0x1 == 1
    }

    /// Returns true for the ops a node expects an `AN` acknowledgment for.
    pub fn needs_ack(self) -> bool {
        matches!(self, SlOp::Ds | SlOp::On)
    }

    /// Two-letter mnemonic, as used in logs and stored records.
    pub fn code(self) -> &'static str {
        match self {
            SlOp::Dn => "DN",
            SlOp::Bn => "BN",
            SlOp::Gs => "GS",
            SlOp::Td => "TD",
            SlOp::Sc => "SC",
            SlOp::Bc => "BC",
            SlOp::Br => "BR",
            SlOp::An => "AN",
            SlOp::Ds => "DS",
            SlOp::Bs => "BS",
            SlOp::On => "ON",
            SlOp::As => "AS",
            SlOp::Of => "OF",
            SlOp::Tr => "TR",
            SlOp::Ss => "SS",
            SlOp::Nc => "NC",
        }
    }

    /// Parses a two-letter mnemonic back to the op code.
    pub fn from_code(code: &str) -> Option<Self> {
        let op = match code {
            "DN" => SlOp::Dn,
            "BN" => SlOp::Bn,
            "GS" => SlOp::Gs,
            "TD" => SlOp::Td,
            "SC" => SlOp::Sc,
            "BC" => SlOp::Bc,
            "BR" => SlOp::Br,
            "AN" => SlOp::An,
            "DS" => SlOp::Ds,
            "BS" => SlOp::Bs,
            "ON" => SlOp::On,
            "AS" => SlOp::As,
            "OF" => SlOp::Of,
            "TR" => SlOp::Tr,
            "SS" => SlOp::Ss,
            "NC" => SlOp::Nc,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for SlOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Result codes carried in `AS` acknowledgment payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckCode {
    /// Message accepted.
    Success,
    /// Duplicate packet suppressed, ack re-sent.
    DuplicateSuppressed,
    /// Unexpected packet, dropped.
    Unexpected,
    /// Any other code the firmware may emit.
    Other(u8),
}

impl AckCode {
    /// Decodes the single ack result byte.
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            0 => AckCode::Success,
            1 => AckCode::DuplicateSuppressed,
            2 => AckCode::Unexpected,
            other => AckCode::Other(other),
        }
    }
}

impl fmt::Display for AckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckCode::Success => write!(f, "Success"),
            AckCode::DuplicateSuppressed => write!(f, "Suppressed duplicate pkt"),
            AckCode::Unexpected => write!(f, "Unexpected pkt, dropping"),
            AckCode::Other(code) => write!(f, "Unknown ack code {code}"),
        }
    }
}
