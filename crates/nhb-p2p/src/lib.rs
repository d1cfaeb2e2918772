//! libp2p networking layer for nhb nodes.
//!
//! GossipSub broadcasts transactions, block proposals and votes to all
//! connected peers; Kademlia handles peer discovery from a bootstrap list;
//! identify and ping maintain connection metadata and liveness. This crate
//! only moves bytes between peers — decoding `P2pMessage::payload` into a
//! `Transaction` or a consensus-engine wire type is the node controller's
//! job, not this one's.

pub mod config;
pub mod message;
pub mod network;

pub use config::P2pConfig;
pub use message::P2pMessage;
pub use network::{P2pHandle, P2pNetwork};
