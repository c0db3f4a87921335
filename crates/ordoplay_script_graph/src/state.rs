// SPDX-License-Identifier: MIT OR Apache-2.0
//! States: named containers of nodes and the connections among them.

use crate::change::{Change, ChangeKind, ChangeQueue, ChangeSubject};
use crate::connection::{Connection, ConnectionId, StructuralError};
use crate::node::{Node, NodeId};
use crate::port::{Port, PortDirection, PortId, PortKind, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateId(pub Uuid);

impl StateId {
    /// Create a new random state ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StateId {
    fn default() -> Self {
        Self::new()
    }
}

/// Error when editing nodes, ports or states
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    /// State not found
    #[error("State not found: {0:?}")]
    StateNotFound(StateId),

    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Another node already uses this ID
    #[error("Duplicate node ID: {0:?}")]
    DuplicateNode(NodeId),

    /// The node still belongs to a state
    #[error("Node {node:?} is already attached to state {state:?}")]
    NodeAttached {
        /// The node
        node: NodeId,
        /// Its current state
        state: StateId,
    },

    /// Port not found
    #[error("Port not found: {0:?}")]
    PortNotFound(PortId),

    /// Fixed ports of a node kind cannot be removed
    #[error("Port {0:?} belongs to the node's fixed layout")]
    FixedPort(PortId),

    /// Invalid wiring
    #[error(transparent)]
    Structural(#[from] StructuralError),
}

/// A named container of nodes and connections, one behavioural mode of a script
#[derive(Debug, Clone)]
pub struct State {
    id: StateId,
    name: String,
    nodes: IndexMap<NodeId, Node>,
    connections: IndexMap<ConnectionId, Connection>,
    changes: ChangeQueue,
}

impl State {
    /// Create a new empty state
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(StateId::new(), name)
    }

    pub(crate) fn with_id(id: StateId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            changes: ChangeQueue::new(),
        }
    }

    /// Unique state ID
    pub fn id(&self) -> StateId {
        self.id
    }

    /// State name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the state; returns whether the name changed. Renaming to the
    /// current name raises no notification.
    pub fn rename(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.name == name {
            return false;
        }
        self.name = name;
        self.changes
            .push(Change::new(ChangeSubject::State(self.id), ChangeKind::NameChanged));
        true
    }

    /// Add a detached node, taking ownership of it
    pub fn add_node(&mut self, mut node: Node) -> Result<NodeId, EditError> {
        self.prune_dangling();

        let id = node.id();
        if let Some(state) = node.state() {
            return Err(EditError::NodeAttached { node: id, state });
        }
        if self.nodes.contains_key(&id) {
            return Err(EditError::DuplicateNode(id));
        }

        node.set_state(Some(self.id));
        self.nodes.insert(id, node);
        tracing::debug!(state = %self.name, node = ?id, "node added");
        Ok(id)
    }

    /// Detach a node and drop its connections. Removing a node that is not
    /// here is a no-op returning `None`.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.prune_dangling();

        let mut node = self.nodes.shift_remove(&node_id)?;
        self.connections.retain(|_, c| !c.involves_node(node_id));
        node.set_state(None);
        tracing::debug!(state = %self.name, node = ?node_id, "node removed");
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Whether the node is in this state
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node IDs in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get a node by its position
    pub fn node_at(&self, index: usize) -> Option<&Node> {
        self.nodes.get_index(index).map(|(_, node)| node)
    }

    /// Position of a node in insertion order
    pub fn index_of(&self, node_id: NodeId) -> Option<usize> {
        self.nodes.get_index_of(&node_id)
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add a connection between ports
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Result<ConnectionId, StructuralError> {
        self.prune_dangling();

        let source_node = self
            .nodes
            .get(&from_node)
            .ok_or(StructuralError::NodeNotFound(from_node))?;
        let target_node = self
            .nodes
            .get(&to_node)
            .ok_or(StructuralError::NodeNotFound(to_node))?;

        let source_port = source_node
            .port(from_port)
            .ok_or(StructuralError::PortNotFound(from_port))?;
        let target_port = target_node
            .port(to_port)
            .ok_or(StructuralError::PortNotFound(to_port))?;

        self.check_link(source_port, target_port)?;

        let connection = Connection::new(from_node, from_port, to_node, to_port);
        let id = connection.id;
        self.connections.insert(id, connection);
        tracing::debug!(state = %self.name, connection = ?id, "ports connected");
        Ok(id)
    }

    fn check_link(&self, source: &Port, target: &Port) -> Result<(), StructuralError> {
        source.check_connection(target)?;

        if self
            .connections
            .values()
            .any(|c| c.from_port == source.id() && c.to_port == target.id())
        {
            return Err(StructuralError::DuplicateConnection);
        }

        // A value input reads from exactly one source
        if matches!(target.kind(), PortKind::Value(_))
            && self.connections.values().any(|c| c.to_port == target.id())
        {
            return Err(StructuralError::PortAlreadyConnected(target.id()));
        }

        Ok(())
    }

    /// Store a connection decoded from a document. Structural rules are
    /// checked for endpoints that exist; missing endpoints are kept as
    /// dangling references.
    pub(crate) fn restore_connection(&mut self, connection: Connection) -> Result<(), StructuralError> {
        let source = self
            .nodes
            .get(&connection.from_node)
            .and_then(|n| n.port(connection.from_port));
        let target = self
            .nodes
            .get(&connection.to_node)
            .and_then(|n| n.port(connection.to_port));

        if let (Some(source), Some(target)) = (source, target) {
            self.check_link(source, target)?;
        }

        self.connections.insert(connection.id, connection);
        Ok(())
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        self.prune_dangling();
        self.connections.shift_remove(&connection_id)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// All connections in the order they were established
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections from a specific port
    pub fn connections_from(&self, port_id: PortId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.from_port == port_id)
    }

    /// Get connections to a specific port
    pub fn connections_to(&self, port_id: PortId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.to_port == port_id)
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether a connection points at a node or port that no longer exists
    pub fn is_dangling(&self, connection: &Connection) -> bool {
        let has = |node: NodeId, port: PortId| {
            self.nodes
                .get(&node)
                .is_some_and(|n| n.port(port).is_some())
        };
        !(has(connection.from_node, connection.from_port) && has(connection.to_node, connection.to_port))
    }

    /// Drop dangling connections, returning how many were removed
    pub fn prune_dangling(&mut self) -> usize {
        let dangling: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| self.is_dangling(c))
            .map(|c| c.id)
            .collect();

        for id in dangling.iter() {
            self.connections.shift_remove(id);
        }
        if !dangling.is_empty() {
            tracing::debug!(state = %self.name, count = dangling.len(), "pruned dangling connections");
        }
        dangling.len()
    }

    /// Remove a non-fixed port from a node along with its connections
    pub fn remove_port(&mut self, node_id: NodeId, port_id: PortId) -> Result<Port, EditError> {
        self.prune_dangling();

        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(EditError::NodeNotFound(node_id))?;
        let port = node.take_port(port_id)?;
        self.connections.retain(|_, c| !c.involves_port(port_id));
        Ok(port)
    }

    /// Set the literal default of a value input; `None` clears it
    pub fn set_port_default(
        &mut self,
        node_id: NodeId,
        port_id: PortId,
        value: Option<Value>,
    ) -> Result<(), EditError> {
        let port = self
            .nodes
            .get_mut(&node_id)
            .ok_or(EditError::NodeNotFound(node_id))?
            .port_mut(port_id)
            .ok_or(EditError::PortNotFound(port_id))?;
        if port.direction != PortDirection::Input || port.is_event() {
            return Err(EditError::PortNotFound(port_id));
        }
        port.default_enabled = value.is_some();
        port.default = value;
        Ok(())
    }

    /// Take pending change notifications for the state and its nodes
    pub fn drain_changes(&mut self) -> Vec<Change> {
        let mut changes = self.changes.drain();
        for node in self.nodes.values_mut() {
            changes.extend(node.drain_changes());
        }
        changes
    }

    /// Deep copy with fresh identities. Internal connections are re-pointed
    /// to the cloned nodes; dangling connections are not copied.
    pub fn clone_detached(&self, name: impl Into<String>) -> State {
        let mut state = State::new(name);
        let mut node_map = HashMap::new();
        let mut port_map = HashMap::new();

        for node in self.nodes.values() {
            let (mut copy, ports) = node.clone_with_port_map();
            node_map.insert(node.id(), copy.id());
            port_map.extend(ports);
            copy.set_state(Some(state.id));
            state.nodes.insert(copy.id(), copy);
        }

        for connection in self.connections.values() {
            let endpoints = (
                node_map.get(&connection.from_node),
                port_map.get(&connection.from_port),
                node_map.get(&connection.to_node),
                port_map.get(&connection.to_port),
            );
            if let (Some(from_node), Some(from_port), Some(to_node), Some(to_port)) = endpoints {
                let copy = Connection::new(*from_node, *from_port, *to_node, *to_port);
                state.connections.insert(copy.id, copy);
            }
        }

        state
    }
}
