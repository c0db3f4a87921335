// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for script graphs.
//!
//! A node is a closed tagged variant ([`NodeKind`]) plus editor metadata and
//! an ordered list of ports. Nodes are owned by a [`State`]; the node only
//! keeps a non-owning [`StateId`] handle back to it.

use crate::change::{Change, ChangeKind, ChangeQueue, ChangeSubject};
use crate::port::{Port, PortDirection, PortId, Value, ValueType};
use crate::state::{EditError, State, StateId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Node category, used to organize the palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Event entry points and emitters
    Event,
    /// Host actions
    Action,
    /// Conditions and branching
    Logic,
    /// Variables and constants
    Variable,
    /// State machine flow
    Flow,
}

impl NodeCategory {
    /// Palette section name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Event => "Events",
            Self::Action => "Actions",
            Self::Logic => "Logic",
            Self::Variable => "Variables",
            Self::Flow => "Flow",
        }
    }

    /// Header color for node views
    pub fn header_color(&self) -> [u8; 3] {
        match self {
            Self::Event => [220, 64, 64],
            Self::Action => [64, 120, 200],
            Self::Logic => [110, 110, 110],
            Self::Variable => [64, 180, 96],
            Self::Flow => [200, 140, 40],
        }
    }
}

/// Comparison performed by a condition node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `a` is truthy, `b` is ignored
    IsTrue,
    /// `a == b`
    Equal,
    /// `a != b`
    NotEqual,
    /// `a < b`
    Less,
    /// `a <= b`
    LessEqual,
    /// `a > b`
    Greater,
    /// `a >= b`
    GreaterEqual,
}

impl CompareOp {
    /// Operator symbol for views
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::IsTrue => "?",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
        }
    }
}

/// Node variants and their parameters
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Entry point triggered when the named event is fired
    EventReceiver {
        /// Event name this node listens to
        event: String,
    },
    /// Raises an outbound event to the host
    EventEmitter {
        /// Event name to raise
        event: String,
    },
    /// Runs a host action with the node's value inputs as arguments
    Action {
        /// Host action name
        action: String,
    },
    /// Compares its inputs and fires `True` or `False`
    Condition {
        /// Comparison to perform
        op: CompareOp,
    },
    /// Reads and writes a script variable
    Variable {
        /// Variable name
        variable: String,
    },
    /// Outputs a constant value
    Constant {
        /// The value
        value: Value,
    },
    /// Changes the instance's current state once the pass completes
    StateSwitch {
        /// State to switch to
        target: Option<StateId>,
    },
}

impl NodeKind {
    /// Stable type identifier used by the palette and documents
    pub fn type_id(&self) -> &'static str {
        match self {
            Self::EventReceiver { .. } => "event_receiver",
            Self::EventEmitter { .. } => "event_emitter",
            Self::Action { .. } => "action",
            Self::Condition { .. } => "condition",
            Self::Variable { .. } => "variable",
            Self::Constant { .. } => "constant",
            Self::StateSwitch { .. } => "state_switch",
        }
    }

    /// Palette category
    pub fn category(&self) -> NodeCategory {
        match self {
            Self::EventReceiver { .. } | Self::EventEmitter { .. } => NodeCategory::Event,
            Self::Action { .. } => NodeCategory::Action,
            Self::Condition { .. } => NodeCategory::Logic,
            Self::Variable { .. } | Self::Constant { .. } => NodeCategory::Variable,
            Self::StateSwitch { .. } => NodeCategory::Flow,
        }
    }

    /// Ports every node of this kind starts with
    pub fn default_ports(&self) -> Vec<Port> {
        match self {
            Self::EventReceiver { .. } => vec![Port::event_out("Out")],
            Self::EventEmitter { .. } | Self::Action { .. } => {
                vec![Port::event_in("In"), Port::event_out("Then")]
            }
            Self::Condition { .. } => vec![
                Port::event_in("In"),
                Port::value_in("A", ValueType::Any),
                Port::value_in("B", ValueType::Any),
                Port::event_out("True"),
                Port::event_out("False"),
            ],
            Self::Variable { .. } => vec![
                Port::value_out("Value", ValueType::Any),
                Port::event_in("Set"),
                Port::value_in("New Value", ValueType::Any),
                Port::event_out("Then"),
            ],
            Self::Constant { value } => vec![Port::value_out("Value", value.value_type())],
            Self::StateSwitch { .. } => vec![Port::event_in("In")],
        }
    }

    /// Whether this node is triggered by the named event
    pub fn listens_to(&self, name: &str) -> bool {
        matches!(self, Self::EventReceiver { event } if event == name)
    }
}

/// A node instance
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    state: Option<StateId>,
    location: [f32; 2],
    comment: String,
    ports: Vec<Port>,
    changes: ChangeQueue,
}

impl Node {
    /// Create a detached node with the kind's default ports
    pub fn new(kind: NodeKind) -> Self {
        let ports = kind.default_ports();
        Self::from_parts(NodeId::new(), kind, [0.0, 0.0], String::new(), ports)
    }

    /// Assemble a detached node from stored parts; port indices are reassigned
    pub(crate) fn from_parts(
        id: NodeId,
        kind: NodeKind,
        location: [f32; 2],
        comment: String,
        ports: Vec<Port>,
    ) -> Self {
        let mut node = Self {
            id,
            kind,
            state: None,
            location,
            comment,
            ports,
            changes: ChangeQueue::new(),
        };
        node.reindex_ports();
        node
    }

    /// Set the location
    pub fn with_location(mut self, x: f32, y: f32) -> Self {
        self.location = [x, y];
        self
    }

    /// Set the comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Add an extra port
    pub fn with_port(mut self, port: Port) -> Self {
        self.add_port(port);
        self
    }

    /// Unique node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Node variant and parameters
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Owning state, `None` when detached
    pub fn state(&self) -> Option<StateId> {
        self.state
    }

    /// Whether the node is attached to a state
    pub fn is_attached(&self) -> bool {
        self.state.is_some()
    }

    pub(crate) fn set_state(&mut self, state: Option<StateId>) {
        self.state = state;
    }

    /// Editor location (opaque to the runtime)
    pub fn location(&self) -> [f32; 2] {
        self.location
    }

    /// Assign the location. Always raises a notification.
    pub fn set_location(&mut self, location: [f32; 2]) {
        self.location = location;
        self.notify(ChangeSubject::Node(self.id), ChangeKind::LocationChanged);
    }

    /// Free-text comment
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Assign the comment. Always raises a notification.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
        self.notify(ChangeSubject::Node(self.id), ChangeKind::CommentChanged);
    }

    /// All ports in index order
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Get a port by ID
    pub fn port(&self, port_id: PortId) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == port_id)
    }

    /// Get a port by index
    pub fn port_at(&self, index: usize) -> Option<&Port> {
        self.ports.get(index)
    }

    /// First port with the given name
    pub fn port_named(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Input ports
    pub fn inputs(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.direction == PortDirection::Input)
    }

    /// Output ports
    pub fn outputs(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.direction == PortDirection::Output)
    }

    /// The `n`-th port with the given direction and kind family
    pub(crate) fn nth_port(&self, direction: PortDirection, event: bool, n: usize) -> Option<&Port> {
        self.ports
            .iter()
            .filter(|p| p.direction == direction && p.is_event() == event)
            .nth(n)
    }

    /// Rename a port. Renaming to the current name is a no-op and raises no
    /// notification; returns whether the name changed.
    pub fn rename_port(&mut self, port_id: PortId, name: impl Into<String>) -> Result<bool, EditError> {
        let name = name.into();
        let node = self.id;
        let port = self
            .ports
            .iter_mut()
            .find(|p| p.id == port_id)
            .ok_or(EditError::PortNotFound(port_id))?;

        if port.name == name {
            return Ok(false);
        }
        port.name = name;
        self.notify(ChangeSubject::Port { node, port: port_id }, ChangeKind::NameChanged);
        Ok(true)
    }

    /// Append a port; its index is assigned here
    pub fn add_port(&mut self, port: Port) -> PortId {
        let id = port.id;
        self.ports.push(port);
        self.reindex_ports();
        id
    }

    /// Number of leading ports that belong to the kind's fixed layout
    pub fn fixed_port_count(&self) -> usize {
        self.kind.default_ports().len()
    }

    /// Remove a port that is not part of the fixed layout. Connections are
    /// the owning state's business, see [`State::remove_port`].
    pub(crate) fn take_port(&mut self, port_id: PortId) -> Result<Port, EditError> {
        let index = self
            .ports
            .iter()
            .position(|p| p.id == port_id)
            .ok_or(EditError::PortNotFound(port_id))?;
        if index < self.fixed_port_count() {
            return Err(EditError::FixedPort(port_id));
        }
        let port = self.ports.remove(index);
        self.reindex_ports();
        Ok(port)
    }

    pub(crate) fn port_mut(&mut self, port_id: PortId) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.id == port_id)
    }

    fn reindex_ports(&mut self) {
        for (index, port) in self.ports.iter_mut().enumerate() {
            port.index = index;
        }
    }

    pub(crate) fn notify(&mut self, subject: ChangeSubject, kind: ChangeKind) {
        self.changes.push(Change::new(subject, kind));
    }

    /// Take pending change notifications
    pub fn drain_changes(&mut self) -> Vec<Change> {
        self.changes.drain()
    }

    /// Structurally independent copy with fresh node and port identities,
    /// not attached to any state
    pub fn clone_detached(&self) -> Node {
        self.clone_with_port_map().0
    }

    /// Clone and attach the copy to `state`
    pub fn clone_into(&self, state: &mut State) -> Result<NodeId, EditError> {
        state.add_node(self.clone_detached())
    }

    /// Clone with fresh identities, returning the old-to-new port mapping
    pub(crate) fn clone_with_port_map(&self) -> (Node, Vec<(PortId, PortId)>) {
        let ports: Vec<Port> = self.ports.iter().map(Port::duplicate).collect();
        let mapping = self
            .ports
            .iter()
            .zip(ports.iter())
            .map(|(old, new)| (old.id, new.id))
            .collect();
        let node = Self::from_parts(
            NodeId::new(),
            self.kind.clone(),
            self.location,
            self.comment.clone(),
            ports,
        );
        (node, mapping)
    }
}
