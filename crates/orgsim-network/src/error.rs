//! Error types for the `orgsim-network` crate.
//!
//! Every failure here is a construction-time validation failure: a
//! [`GraphTopology`](crate::GraphTopology) that exists is always consistent.

use orgsim_types::NodeId;

/// Errors that can occur while building a topology.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// An edge references a node that was never declared.
    #[error("edge {from} -> {to} references unknown node {missing}")]
    UnknownEndpoint {
        /// Declared source of the edge.
        from: NodeId,
        /// Declared target of the edge.
        to: NodeId,
        /// The endpoint that does not exist.
        missing: NodeId,
    },

    /// The same node id was declared twice.
    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// An edge weight is NaN or infinite.
    #[error("edge {from} -> {to} has non-finite weight {weight}")]
    InvalidWeight {
        /// Declared source of the edge.
        from: NodeId,
        /// Declared target of the edge.
        to: NodeId,
        /// The offending weight.
        weight: f64,
    },
}
