// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Node liveness states.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Liveness state of a node session.
///
/// The "up" group (`Online`, `Ok`, `Up`, `Transmitting`) answers liveness
/// queries; everything else counts as down. `Ok` and `Up` are reported by
/// node firmware in `SS` status snapshots, the store never sets them
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    /// Never heard from.
    Initial,
    /// Signed on with `ON`.
    Online,
    /// Firmware-reported healthy state.
    Ok,
    /// Firmware-reported up state.
    Up,
    /// Heard from recently without a full sign-on.
    Transmitting,
    /// Expected periodic contact has been missed beyond the silence budget.
    Overdue,
    /// Signed off with `OF`.
    Offline,
}

impl NodeState {
    /// True for states in the up group.
    pub fn is_up(self) -> bool {
        matches!(
            self,
            NodeState::Online | NodeState::Ok | NodeState::Up | NodeState::Transmitting
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            NodeState::Initial => "INITIAL",
            NodeState::Online => "ONLINE",
            NodeState::Ok => "OK",
            NodeState::Up => "UP",
            NodeState::Transmitting => "TRANSMITTING",
            NodeState::Overdue => "OVERDUE",
            NodeState::Offline => "OFFLINE",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state name that is not part of the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownState(pub String);

impl FromStr for NodeState {
    type Err = UnknownState;

    /// Parses the textual state names nodes report in `SS` payloads.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let state = match s {
            "INITIAL" => NodeState::Initial,
            "ONLINE" => NodeState::Online,
            "OK" => NodeState::Ok,
            "UP" => NodeState::Up,
            "TRANSMITTING" => NodeState::Transmitting,
            "OVERDUE" => NodeState::Overdue,
            "OFFLINE" => NodeState::Offline,
            other => return Err(UnknownState(other.to_string())),
        };
        Ok(state)
    }
}
