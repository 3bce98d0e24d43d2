//! Graph topology for the orgsim simulation engine.
//!
//! Agents live on the nodes of a [`GraphTopology`] and influence each other
//! along its edges. The topology is built once from a generic node/edge
//! description ([`TopologySpec`]) supplied by the data layer, validated, and
//! never mutated afterwards.
//!
//! # Modules
//!
//! - [`topology`] -- Node/edge records, the built graph, and neighbor queries.
//! - [`builders`] -- Canned topologies (ring lattice, star).
//! - [`error`] -- Validation errors ([`NetworkError`]).

pub mod builders;
pub mod error;
pub mod topology;

// Re-export primary types at crate root.
pub use builders::{ring_lattice, star};
pub use error::NetworkError;
pub use topology::{Edge, EdgeRecord, GraphTopology, Neighbor, Node, NodeRecord, TopologySpec};
