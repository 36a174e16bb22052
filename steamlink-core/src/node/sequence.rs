// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sequence Number Tracking
//!
//! Per-node packet number assignment and duplicate/loss detection. Data and
//! control streams number independently. Counters are 16-bit and skip 0 on
//! wrap: 0 is reserved to mean "no history yet".

/// Classification of a received sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqCheck {
    /// In order, or first contact with the node.
    Fresh,
    /// Same number as the previous packet.
    Duplicate,
    /// Sequence restarted at 1: the peer rebooted. No gap accounted.
    Restarted,
    /// Fresh, but this many packets were missed before it.
    Missed(u16),
}

/// Per-node sequence state for both streams.
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    next_data: u16,
    next_control: u16,
    last_received: u16,
}

impl SequenceTracker {
    pub fn new() -> Self {
        SequenceTracker::default()
    }

    /// Assigns the next sequence number for the given stream, skipping 0
    /// on wraparound.
    pub fn assign(&mut self, is_data: bool) -> u16 {
        let counter = if is_data {
            &mut self.next_data
        } else {
            &mut self.next_control
        };
        *counter = counter.wrapping_add(1);
        if *counter == 0 {
            *counter = 1;
        }
        *counter
    }

    /// Last sequence number received from the peer, 0 if none yet.
    pub fn last_received(&self) -> u16 {
        self.last_received
    }

    /// Classifies a received sequence number against the last one seen.
    ///
    /// Classification follows *arrival* order: a reordered packet shows up
    /// as missed-then-duplicate, the protocol does not resequence.
    pub fn check(&mut self, received: u16) -> SeqCheck {
        let last = self.last_received;
        self.last_received = received;

        if last == 0 {
            // First packet ever from this node, nothing to compare against.
            return SeqCheck::Fresh;
        }
        let expected = if last == 0xFFFF { 1 } else { last + 1 };
        if received == expected {
            return SeqCheck::Fresh;
        }
        if received == last {
            return SeqCheck::Duplicate;
        }
        if received == 1 {
            return SeqCheck::Restarted;
        }
        SeqCheck::Missed(received.wrapping_sub(expected))
    }
}
