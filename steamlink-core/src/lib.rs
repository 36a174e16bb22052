//! SteamLink Core Library
//!
//! Gateway-side engine for the SteamLink LoRa mesh: wire codec for the
//! compact binary frame format, per-node session tracking (sequence
//! numbers, confirmable delivery, lifecycle state), a persistent node
//! and mesh registry, and the gateway service that ties them to a
//! message transport.

pub mod gateway;
pub mod node;
pub mod protocol;
pub mod registry;
pub mod transport;

pub use gateway::{Gateway, GatewayConfig, GatewayError, STORE_TOPIC};
pub use node::{
    AckTick, AckWaiter, Busy, Mesh, Node, NodeEffect, NodeError, NodeRecord, NodeState,
    PacketCounters, SeqCheck, SequenceTracker, TestReport, ACK_WAIT_SECS, MAX_RESEND_COUNT,
};
pub use protocol::{
    decode, encode, AckCode, NodeCfg, Packet, Payload, ProtocolError, SlOp, MAX_HOPS,
    MAX_SILENCE_SECS, NODE_CFG_LEN, SL_MAX_MESSAGE_LEN,
};
pub use registry::{
    MemoryStore, PacketRecord, Registry, Store, StoreError, MESH_TABLE, NODE_TABLE, PACKET_TABLE,
};
#[cfg(feature = "sqlite-store")]
pub use registry::SqliteStore;
pub use transport::{Channel, Destination, MockTransport, Transport, TransportError};
