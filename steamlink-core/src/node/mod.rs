// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Node Session Layer
//!
//! Per-peer protocol state: sequence tracking, the single-outstanding-ack
//! discipline, the liveness state machine, and the mesh aggregates.

mod ack_wait;
mod mesh;
mod sequence;
mod session;
mod state;

pub use ack_wait::{AckTick, AckWaiter, Busy, ACK_WAIT_SECS, MAX_RESEND_COUNT};
pub use mesh::Mesh;
pub use sequence::{SeqCheck, SequenceTracker};
pub use session::{Node, NodeEffect, NodeError, NodeRecord, PacketCounters, TestReport};
pub use state::{NodeState, UnknownState};
