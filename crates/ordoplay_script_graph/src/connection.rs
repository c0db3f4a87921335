// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::node::NodeId;
use crate::port::{PortId, ValueType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A directed connection from an output port to an input port
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Source node ID
    pub from_node: NodeId,
    /// Source port ID
    pub from_port: PortId,
    /// Target node ID
    pub to_node: NodeId,
    /// Target port ID
    pub to_port: PortId,
}

impl Connection {
    /// Create a new connection
    pub fn new(from_node: NodeId, from_port: PortId, to_node: NodeId, to_port: PortId) -> Self {
        Self {
            id: ConnectionId::new(),
            from_node,
            from_port,
            to_node,
            to_port,
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }

    /// Check if this connection involves a specific port
    pub fn involves_port(&self, port_id: PortId) -> bool {
        self.from_port == port_id || self.to_port == port_id
    }

    /// Check if this connection links the same ports as `other`
    pub fn same_link(&self, other: &Connection) -> bool {
        self.from_port == other.from_port && self.to_port == other.to_port
    }
}

/// Invalid wiring, rejected before anything is stored
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StructuralError {
    /// Node not found in the container
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Port not found on its node
    #[error("Port not found: {0:?}")]
    PortNotFound(PortId),

    /// Source must be an output and destination an input
    #[error("Connections must run from an output port to an input port")]
    DirectionMismatch,

    /// Event ports only connect to event ports, value ports to value ports
    #[error("Cannot connect an event port to a value port")]
    KindMismatch,

    /// Incompatible value types
    #[error("Incompatible value types: {from:?} -> {to:?}")]
    IncompatibleTypes {
        /// Source type
        from: ValueType,
        /// Destination type
        to: ValueType,
    },

    /// Value input already has a source
    #[error("Port already connected: {0:?}")]
    PortAlreadyConnected(PortId),

    /// The same ports are already linked
    #[error("Connection already exists")]
    DuplicateConnection,

    /// Endpoints live in different states
    #[error("Nodes {from:?} and {to:?} belong to different states")]
    CrossState {
        /// Source node
        from: NodeId,
        /// Destination node
        to: NodeId,
    },
}
