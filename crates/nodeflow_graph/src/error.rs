// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error taxonomy of the engine.
//!
//! Constraint violations and invalid gestures are recovered inside the engine
//! (the mutation is rejected, the gesture aborted). Only serialization errors
//! are meant to reach the calling application.

use crate::connection::Endpoint;
use crate::id::{ConnectionId, NodeId, PortId};
use thiserror::Error;

/// Why an endpoint failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointFault {
    /// The node does not exist
    MissingNode,
    /// The node exists but has no such port
    MissingPort,
    /// The port exists but has the wrong direction for this end
    WrongDirection,
}

/// Coarse classification of a [`GraphConstraintViolation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// A node, port or connection id is already taken
    DuplicateId,
    /// An endpoint does not resolve to a compatible port
    DanglingEndpoint,
    /// A port would exceed its connection capacity
    PortCapacityExceeded,
    /// The port pair is already connected
    DuplicateConnection,
    /// A patch targets a node that does not exist
    UnknownNode,
    /// Node position or size is not a finite, non-negative geometry
    InvalidGeometry,
}

/// A mutation that would break a graph invariant.
///
/// The store is left unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphConstraintViolation {
    /// Node id already present
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    /// Two ports on one node share an id
    #[error("Duplicate port id {port} on node {node}")]
    DuplicatePortId {
        /// Node carrying the ports
        node: NodeId,
        /// Repeated port id
        port: PortId,
    },

    /// Connection id already present
    #[error("Duplicate connection id: {0}")]
    DuplicateConnectionId(ConnectionId),

    /// Endpoint does not resolve
    #[error("Dangling endpoint {endpoint} on connection {connection}: {fault:?}")]
    DanglingEndpoint {
        /// Offending connection
        connection: ConnectionId,
        /// Endpoint that failed to resolve
        endpoint: Endpoint,
        /// Reason
        fault: EndpointFault,
    },

    /// Port already holds its maximum number of connections
    #[error("Port {endpoint} is full ({capacity} connection(s) allowed)")]
    PortCapacityExceeded {
        /// Full port
        endpoint: Endpoint,
        /// Its capacity
        capacity: usize,
    },

    /// The same source/target pair is already connected
    #[error("Ports {source_endpoint} -> {target_endpoint} are already connected by {existing}")]
    DuplicateConnection {
        /// Existing connection
        existing: ConnectionId,
        /// Source of the rejected connection
        source_endpoint: Endpoint,
        /// Target of the rejected connection
        target_endpoint: Endpoint,
    },

    /// Patch against a missing node
    #[error("Node not found: {0}")]
    UnknownNode(NodeId),

    /// Non-finite position, or a size that is negative or non-finite
    #[error("Invalid geometry on node {node}: position {x}, {y} size {w} x {h}")]
    InvalidGeometry {
        /// Offending node
        node: NodeId,
        /// Position x
        x: f32,
        /// Position y
        y: f32,
        /// Width
        w: f32,
        /// Height
        h: f32,
    },
}

impl GraphConstraintViolation {
    /// Classify the violation
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::DuplicateNodeId(_) | Self::DuplicatePortId { .. } | Self::DuplicateConnectionId(_) => {
                ConstraintKind::DuplicateId
            }
            Self::DanglingEndpoint { .. } => ConstraintKind::DanglingEndpoint,
            Self::PortCapacityExceeded { .. } => ConstraintKind::PortCapacityExceeded,
            Self::DuplicateConnection { .. } => ConstraintKind::DuplicateConnection,
            Self::UnknownNode(_) => ConstraintKind::UnknownNode,
            Self::InvalidGeometry { .. } => ConstraintKind::InvalidGeometry,
        }
    }
}

/// Why a gesture was aborted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidGesture {
    /// A node taking part in the gesture disappeared
    #[error("Node vanished during gesture: {0}")]
    NodeVanished(NodeId),

    /// The port the gesture started from disappeared
    #[error("Port vanished during gesture: {0}")]
    PortVanished(Endpoint),

    /// The two ports cannot be linked in an output -> input direction
    #[error("Incompatible port directions: {from} -> {to}")]
    IncompatibleDirection {
        /// Port the gesture started from
        from: Endpoint,
        /// Port under the cursor
        to: Endpoint,
    },

    /// The caller's before-complete hook refused the connection
    #[error("Connection rejected by validator")]
    RejectedByValidator,

    /// The store refused the commit
    #[error("Commit rejected: {0}")]
    Rejected(#[from] GraphConstraintViolation),
}

/// Malformed snapshot. Loading fails as a whole and never partially populates a graph.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RON decoding failed
    #[error("RON error: {0}")]
    RonDecode(#[from] ron::error::SpannedError),

    /// RON encoding failed
    #[error("RON error: {0}")]
    RonEncode(#[from] ron::Error),

    /// Unsupported snapshot version
    #[error("Unsupported snapshot version {found} (expected {expected})")]
    Version {
        /// Version found in the payload
        found: u32,
        /// Version this build reads
        expected: u32,
    },

    /// The payload decodes but breaks a graph invariant
    #[error("Invalid graph: {0}")]
    Invalid(#[from] GraphConstraintViolation),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            GraphConstraintViolation::DuplicateNodeId(NodeId::from("n")).kind(),
            ConstraintKind::DuplicateId
        );
        let full = GraphConstraintViolation::PortCapacityExceeded {
            endpoint: Endpoint::new("n", "i"),
            capacity: 1,
        };
        assert_eq!(full.kind(), ConstraintKind::PortCapacityExceeded);
        assert_eq!(full.to_string(), "Port n.i is full (1 connection(s) allowed)");
    }
}
