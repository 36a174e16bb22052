// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Confirmable Send Discipline
//!
//! The radio link is half-duplex and slow, so the protocol allows at most
//! one outstanding confirmable exchange per node: a control send that
//! expects an `AS` acknowledgment blocks further confirmable sends until
//! the ack arrives, the retries are exhausted, or the peer restarts.

use thiserror::Error;
use tracing::debug;

use crate::protocol::Packet;

/// Seconds to wait for an `AS` before retransmitting.
pub const ACK_WAIT_SECS: u64 = 3;

/// Retransmissions before the exchange is abandoned.
pub const MAX_RESEND_COUNT: u32 = 25;

/// A confirmable send was attempted while one is already outstanding.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("a confirmable send is already awaiting its ack")]
pub struct Busy;

/// Outcome of a timer tick on the waiter.
#[derive(Debug, Clone)]
pub enum AckTick {
    /// Nothing outstanding.
    Idle,
    /// Still inside the wait window.
    Waiting,
    /// Deadline passed: retransmit this packet unchanged (same frame,
    /// same sequence number) and keep waiting.
    Retry(Packet),
    /// Retry limit reached; the exchange is abandoned.
    GaveUp,
}

/// State for the single outstanding confirmable send of one node.
#[derive(Debug, Clone)]
pub struct AckWaiter {
    wait_secs: u64,
    deadline: Option<u64>,
    pending: Option<Packet>,
    resend_count: u32,
    persist_on_ack: bool,
}

impl Default for AckWaiter {
    fn default() -> Self {
        AckWaiter::new(ACK_WAIT_SECS)
    }
}

impl AckWaiter {
    pub fn new(wait_secs: u64) -> Self {
        AckWaiter {
            wait_secs,
            deadline: None,
            pending: None,
            resend_count: 0,
            persist_on_ack: false,
        }
    }

    /// True while an ack is outstanding.
    pub fn is_waiting(&self) -> bool {
        self.deadline.is_some()
    }

    /// Starts waiting for the ack of `packet`.
    ///
    /// With `persist_on_ack` set, [`AckWaiter::acked`] hands the packet
    /// back so the caller can record it durably only once the round trip
    /// confirmed delivery. Fails with [`Busy`] while another exchange is
    /// outstanding.
    pub fn begin(&mut self, packet: Packet, persist_on_ack: bool, now: u64) -> Result<(), Busy> {
        if self.is_waiting() {
            return Err(Busy);
        }
        debug!(%packet, wait_secs = self.wait_secs, "waiting for ack");
        self.deadline = Some(now + self.wait_secs);
        self.pending = Some(packet);
        self.resend_count = 0;
        self.persist_on_ack = persist_on_ack;
        Ok(())
    }

    /// The ack arrived: stop waiting.
    ///
    /// Returns the original packet if `persist_on_ack` was set. A redundant
    /// ack with nothing outstanding is harmless.
    pub fn acked(&mut self) -> Option<Packet> {
        if self.pending.is_none() {
            debug!("redundant ack, nothing outstanding");
        }
        let packet = if self.persist_on_ack {
            self.pending.take()
        } else {
            None
        };
        self.clear();
        packet
    }

    /// Abandons the outstanding exchange, if any. Used when the peer
    /// restarts: its firmware forgot the exchange ever happened.
    pub fn abandon(&mut self) {
        self.clear();
    }

    /// Advances the wait timer.
    pub fn tick(&mut self, now: u64) -> AckTick {
        let Some(deadline) = self.deadline else {
            return AckTick::Idle;
        };
        if now < deadline {
            return AckTick::Waiting;
        }
        self.resend_count += 1;
        if self.resend_count > MAX_RESEND_COUNT {
            self.clear();
            return AckTick::GaveUp;
        }
        match self.pending.clone() {
            Some(packet) => {
                self.deadline = Some(now + self.wait_secs);
                // The stored frame is retransmitted unchanged, not re-encoded.
                AckTick::Retry(packet)
            }
            None => {
                self.clear();
                AckTick::Idle
            }
        }
    }

    /// Seconds until the deadline, 0 if none is set or it has passed.
    pub fn remaining(&self, now: u64) -> u64 {
        self.deadline.map_or(0, |d| d.saturating_sub(now))
    }

    fn clear(&mut self) {
        self.deadline = None;
        self.pending = None;
        self.resend_count = 0;
        self.persist_on_ack = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Packet, SlOp};

    fn packet() -> Packet {
        Packet::outgoing(SlOp::Sc, 0x0104, 1, 0, b"", &[], 100).unwrap()
    }

    #[test]
    fn second_begin_is_busy_until_acked() {
        let mut waiter = AckWaiter::default();
        waiter.begin(packet(), false, 100).unwrap();
        assert_eq!(waiter.begin(packet(), false, 101), Err(Busy));
        waiter.acked();
        assert!(waiter.begin(packet(), false, 102).is_ok());
    }

    #[test]
    fn acked_returns_packet_only_when_persisting() {
        let mut waiter = AckWaiter::default();
        waiter.begin(packet(), false, 100).unwrap();
        assert!(waiter.acked().is_none());

        waiter.begin(packet(), true, 110).unwrap();
        assert!(waiter.acked().is_some());
    }

    #[test]
    fn tick_before_deadline_keeps_waiting() {
        let mut waiter = AckWaiter::default();
        waiter.begin(packet(), false, 100).unwrap();
        assert!(matches!(waiter.tick(101), AckTick::Waiting));
        assert!(matches!(waiter.tick(103), AckTick::Retry(_)));
    }

    #[test]
    fn abandon_frees_the_waiter() {
        let mut waiter = AckWaiter::default();
        waiter.begin(packet(), true, 100).unwrap();
        waiter.abandon();
        assert!(!waiter.is_waiting());
        assert!(waiter.begin(packet(), false, 101).is_ok());
    }
}
