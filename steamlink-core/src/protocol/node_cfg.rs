// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Node Configuration Record
//!
//! Fixed-layout binary record describing a node, as stored in the node's
//! flash and exchanged in `ON` and `SC` payloads. The layout matches the
//! `SL_NodeCfgStruct` in the node firmware byte for byte, little-endian,
//! no padding.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ProtocolError;

/// Current node config record version.
pub const NODE_CFG_VERSION: u8 = 1;

/// Default silence budget in seconds before a node is considered overdue.
pub const MAX_SILENCE_SECS: u8 = 45;

/// Packed size of the record on the wire.
///
/// version:1 + id:4 + name:10 + description:32 + lat:4 + lon:4 +
/// altitude:2 + max_silence:1 + battery:1 + radio_params:1
pub const NODE_CFG_LEN: usize = 60;

const NAME_LEN: usize = 10;
const DESCRIPTION_LEN: usize = 32;

/// Node configuration, the persistent identity of a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCfg {
    /// Record format version.
    pub version: u8,
    /// Node id; the high bits encode the mesh id.
    pub node_id: u32,
    /// Short display name, at most 10 bytes.
    pub name: String,
    /// Free-form description, at most 32 bytes.
    pub description: String,
    /// GPS latitude in degrees.
    pub gps_lat: f32,
    /// GPS longitude in degrees.
    pub gps_lon: f32,
    /// Altitude in meters.
    pub altitude: i16,
    /// Seconds of silence before the node counts as overdue.
    pub max_silence: u8,
    /// True for battery powered nodes.
    pub battery_powered: bool,
    /// Radio parameter set, interpreted by the radio driver.
    pub radio_params: u8,
}

impl NodeCfg {
    /// Creates a default config for a node id, used when a node shows up
    /// without ever having announced its own config.
    pub fn new(node_id: u32) -> Self {
        NodeCfg {
            version: NODE_CFG_VERSION,
            node_id,
            name: format!("Node{node_id:08x}"),
            description: String::new(),
            gps_lat: 0.0,
            gps_lon: 0.0,
            altitude: 0,
            max_silence: MAX_SILENCE_SECS,
            battery_powered: false,
            radio_params: 0,
        }
    }

    /// Packs the record into its fixed 60-byte wire layout.
    ///
    /// `name` and `description` are NUL-padded to their fixed widths;
    /// longer strings are truncated at the field boundary.
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(NODE_CFG_LEN);
        buf.push(self.version);
        buf.extend_from_slice(&self.node_id.to_le_bytes());
        buf.extend_from_slice(&pad_fixed(&self.name, NAME_LEN));
        buf.extend_from_slice(&pad_fixed(&self.description, DESCRIPTION_LEN));
        buf.extend_from_slice(&self.gps_lat.to_le_bytes());
        buf.extend_from_slice(&self.gps_lon.to_le_bytes());
        buf.extend_from_slice(&self.altitude.to_le_bytes());
        buf.push(self.max_silence);
        buf.push(u8::from(self.battery_powered));
        buf.push(self.radio_params);
        debug_assert_eq!(buf.len(), NODE_CFG_LEN);
        buf
    }

    /// Unpacks a record from its wire layout.
    ///
    /// The input must be exactly [`NODE_CFG_LEN`] bytes.
    pub fn unpack(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != NODE_CFG_LEN {
            return Err(ProtocolError::MalformedConfig(format!(
                "wanted {NODE_CFG_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut at = 0usize;
        let version = bytes[at];
        at += 1;
        let node_id = u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
        at += 4;
        let name = unpad_fixed(&bytes[at..at + NAME_LEN]);
        at += NAME_LEN;
        let description = unpad_fixed(&bytes[at..at + DESCRIPTION_LEN]);
        at += DESCRIPTION_LEN;
        let gps_lat = f32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
        at += 4;
        let gps_lon = f32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
        at += 4;
        let altitude = i16::from_le_bytes(bytes[at..at + 2].try_into().unwrap());
        at += 2;
        let max_silence = bytes[at];
        let battery_powered = bytes[at + 1] == 1;
        let radio_params = bytes[at + 2];

        Ok(NodeCfg {
            version,
            node_id,
            name,
            description,
            gps_lat,
            gps_lon,
            altitude,
            max_silence,
            battery_powered,
            radio_params,
        })
    }

    /// Merges a freshly announced config into this one, field by field,
    /// logging every change. Used when a node signs on with `ON`.
    pub fn merge(&mut self, other: &NodeCfg) {
        if self.node_id != other.node_id {
            info!(name = %self.name, from = self.node_id, to = other.node_id, "node changed id");
            self.node_id = other.node_id;
        }
        if self.name != other.name {
            info!(from = %self.name, to = %other.name, "node changed name");
            self.name = other.name.clone();
        }
        if self.description != other.description {
            info!(name = %self.name, from = %self.description, to = %other.description, "node changed description");
            self.description = other.description.clone();
        }
        if self.max_silence != other.max_silence {
            info!(name = %self.name, from = self.max_silence, to = other.max_silence, "node changed max_silence");
            self.max_silence = other.max_silence;
        }
        if self.gps_lat != other.gps_lat {
            info!(name = %self.name, from = self.gps_lat, to = other.gps_lat, "node changed gps_lat");
            self.gps_lat = other.gps_lat;
        }
        if self.gps_lon != other.gps_lon {
            info!(name = %self.name, from = self.gps_lon, to = other.gps_lon, "node changed gps_lon");
            self.gps_lon = other.gps_lon;
        }
        if self.altitude != other.altitude {
            info!(name = %self.name, from = self.altitude, to = other.altitude, "node changed altitude");
            self.altitude = other.altitude;
        }
        if self.battery_powered != other.battery_powered {
            info!(name = %self.name, to = other.battery_powered, "node changed battery_powered");
            self.battery_powered = other.battery_powered;
        }
        if self.radio_params != other.radio_params {
            info!(name = %self.name, from = self.radio_params, to = other.radio_params, "node changed radio_params");
            self.radio_params = other.radio_params;
        }
        self.version = other.version;
    }
}

/// NUL-pads (or truncates) a string to a fixed-width field.
fn pad_fixed(s: &str, width: usize) -> Vec<u8> {
    let mut field = vec![0u8; width];
    let bytes = s.as_bytes();
    let take = bytes.len().min(width);
    field[..take].copy_from_slice(&bytes[..take]);
    field
}

/// Recovers a string from a NUL-padded fixed-width field.
fn unpad_fixed(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_is_exactly_sixty_bytes() {
        let cfg = NodeCfg::new(0x0102);
        assert_eq!(cfg.pack().len(), NODE_CFG_LEN);
    }

    #[test]
    fn pack_unpack_round_trip() {
        let cfg = NodeCfg {
            version: 1,
            node_id: 0x0104,
            name: "weather1".into(),
            description: "rooftop sensor".into(),
            gps_lat: 47.37,
            gps_lon: 8.54,
            altitude: 408,
            max_silence: 45,
            battery_powered: true,
            radio_params: 3,
        };
        let packed = cfg.pack();
        assert_eq!(NodeCfg::unpack(&packed).unwrap(), cfg);
    }

    #[test]
    fn unpack_rejects_wrong_length() {
        assert!(NodeCfg::unpack(&[0u8; 59]).is_err());
        assert!(NodeCfg::unpack(&[0u8; 61]).is_err());
    }

    #[test]
    fn long_name_truncates_at_field_boundary() {
        let mut cfg = NodeCfg::new(7);
        cfg.name = "a-name-way-too-long".into();
        let unpacked = NodeCfg::unpack(&cfg.pack()).unwrap();
        assert_eq!(unpacked.name, "a-name-way");
    }

    #[test]
    fn merge_applies_changed_fields() {
        let mut stored = NodeCfg::new(0x0104);
        let mut announced = NodeCfg::new(0x0104);
        announced.name = "pump2".into();
        announced.max_silence = 90;
        stored.merge(&announced);
        assert_eq!(stored.name, "pump2");
        assert_eq!(stored.max_silence, 90);
    }
}
