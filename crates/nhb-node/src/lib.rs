//! Library surface behind the `nhb-node` binary: the node controller and its
//! price-oracle adapters, exposed so integration tests (and, eventually, an
//! external consensus engine's embedding crate) can drive `Node` directly
//! instead of only through the compiled binary's RPC surface.

pub mod node;
pub mod oracle;

pub use node::{Node, SimulationOutcome};
