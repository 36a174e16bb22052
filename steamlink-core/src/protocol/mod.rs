// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire Protocol Layer
//!
//! The binary packet protocol spoken between the store and the radio nodes.
//!
//! # Architecture
//!
//! - **Op codes**: closed enumeration of frame types; the low bit selects
//!   the data or control header layout
//! - **Node config**: fixed-layout record exchanged in `ON`/`SC` payloads
//! - **Packet codec**: stateless encode/decode, including the nested
//!   bridge encapsulation for multi-hop routes

mod error;
mod node_cfg;
mod op;
mod packet;

pub use error::ProtocolError;
pub use node_cfg::{NodeCfg, MAX_SILENCE_SECS, NODE_CFG_LEN, NODE_CFG_VERSION};
pub use op::{AckCode, SlOp};
pub use packet::{
    decode, encode, Packet, Payload, CONTROL_HEADER_LEN, DATA_HEADER_LEN, MAX_HOPS,
    SL_MAX_MESSAGE_LEN,
};
