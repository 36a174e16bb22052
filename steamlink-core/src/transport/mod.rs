// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport Abstraction
//!
//! The message bus that physically carries encoded frames between the
//! store and the nodes is an external collaborator (MQTT in production).
//! The engine only needs to publish bytes to a destination; inbound
//! traffic arrives through [`crate::gateway::Gateway::on_transport_message`].

mod mock;

pub use mock::MockTransport;

use std::fmt;

use thiserror::Error;

/// Where a published frame is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// A node (or the first hop on its route).
    Node(u32),
    /// The store side of the bus, e.g. forwarded sensor data.
    Store,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Node(id) => write!(f, "{id}"),
            Destination::Store => f.write_str("store"),
        }
    }
}

/// Topic channel a message travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Data,
    Control,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Data => f.write_str("data"),
            Channel::Control => f.write_str("control"),
        }
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport error types.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,

    #[error("publish failed: {0}")]
    PublishFailed(String),
}

/// Publish-only view of the message bus.
///
/// Calls are fire-and-forget from the engine's perspective: results, if
/// any, arrive later as separate inbound messages, never as return values
/// the engine waits on.
pub trait Transport: Send {
    /// Publishes an encoded frame (or a forwarded payload) to a
    /// destination on the given channel.
    fn publish(
        &mut self,
        destination: Destination,
        payload: &[u8],
        channel: Channel,
    ) -> TransportResult<()>;
}
