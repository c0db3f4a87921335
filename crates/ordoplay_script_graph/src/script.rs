// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scripts: the top-level template owning states and variable declarations.
//!
//! A script is shared read-only by every running [`Instance`]; the current
//! state and variable values live in the instance, not here.
//!
//! [`Instance`]: crate::runtime::Instance

use crate::change::Change;
use crate::connection::{Connection, ConnectionId, StructuralError};
use crate::node::{Node, NodeId, NodeKind};
use crate::port::{Port, PortId, Value, ValueType};
use crate::state::{EditError, State, StateId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptId(pub Uuid);

impl ScriptId {
    /// Create a new random script ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScriptId {
    fn default() -> Self {
        Self::new()
    }
}

/// A script variable declaration
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    /// Variable name, unique within the script
    pub name: String,
    /// Declared type
    pub value_type: ValueType,
    /// Value every instance starts with
    pub default: Option<Value>,
}

impl VariableDef {
    /// Declare a variable starting at its type's zero value
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            default: None,
        }
    }

    /// Set the starting value
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Value an instance starts with
    pub fn initial_value(&self) -> Option<Value> {
        self.default.clone().or_else(|| self.value_type.zero())
    }
}

/// A non-fatal problem found by [`Script::validate`]
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    /// The script has no states
    NoStates,
    /// A variable node refers to an undeclared variable
    UnknownVariable {
        /// The node
        node: NodeId,
        /// Variable name
        variable: String,
    },
    /// A state switch has no target
    MissingSwitchTarget {
        /// The node
        node: NodeId,
    },
    /// A state switch targets a state that does not exist
    UnknownSwitchTarget {
        /// The node
        node: NodeId,
        /// Missing state
        target: StateId,
    },
    /// A connection points at a node or port that no longer exists
    DanglingConnection {
        /// Owning state
        state: StateId,
        /// The connection
        connection: ConnectionId,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoStates => write!(f, "script has no states"),
            Self::UnknownVariable { node, variable } => {
                write!(f, "node {node:?} uses undeclared variable '{variable}'")
            }
            Self::MissingSwitchTarget { node } => {
                write!(f, "state switch {node:?} has no target")
            }
            Self::UnknownSwitchTarget { node, target } => {
                write!(f, "state switch {node:?} targets missing state {target:?}")
            }
            Self::DanglingConnection { state, connection } => {
                write!(f, "connection {connection:?} in state {state:?} is dangling")
            }
        }
    }
}

/// A script template
#[derive(Debug, Clone)]
pub struct Script {
    id: ScriptId,
    /// Script name
    pub name: String,
    states: IndexMap<StateId, State>,
    initial_state: Option<StateId>,
    variables: IndexMap<String, VariableDef>,
}

impl Script {
    /// Create a new empty script
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ScriptId::new(), name)
    }

    pub(crate) fn with_id(id: ScriptId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            states: IndexMap::new(),
            initial_state: None,
            variables: IndexMap::new(),
        }
    }

    /// Unique script ID
    pub fn id(&self) -> ScriptId {
        self.id
    }

    /// Add an empty state. The first state becomes the initial state.
    pub fn add_state(&mut self, name: impl Into<String>) -> StateId {
        let state = State::new(name);
        let id = state.id();
        self.states.insert(id, state);
        self.initial_state.get_or_insert(id);
        id
    }

    /// Insert a complete state. Node identities must be unique across the script.
    pub fn insert_state(&mut self, state: State) -> Result<StateId, EditError> {
        if let Some(duplicate) = state.node_ids().find(|id| self.find_node(*id).is_some()) {
            return Err(EditError::DuplicateNode(duplicate));
        }
        let id = state.id();
        self.states.insert(id, state);
        self.initial_state.get_or_insert(id);
        Ok(id)
    }

    /// Remove a state. If it was the initial state, the first remaining
    /// state becomes initial.
    pub fn remove_state(&mut self, state_id: StateId) -> Option<State> {
        let state = self.states.shift_remove(&state_id)?;
        if self.initial_state == Some(state_id) {
            self.initial_state = self.states.keys().next().copied();
        }
        tracing::debug!(state = %state.name(), "state removed");
        Some(state)
    }

    /// Get a state by ID
    pub fn state(&self, state_id: StateId) -> Option<&State> {
        self.states.get(&state_id)
    }

    /// Structural edits go through `Script` so node identity stays unique
    /// across states
    pub(crate) fn state_mut(&mut self, state_id: StateId) -> Option<&mut State> {
        self.states.get_mut(&state_id)
    }

    /// Rename a state; returns whether the name changed
    pub fn rename_state(&mut self, state_id: StateId, name: impl Into<String>) -> Result<bool, EditError> {
        Ok(self
            .states
            .get_mut(&state_id)
            .ok_or(EditError::StateNotFound(state_id))?
            .rename(name))
    }

    /// First state with the given name
    pub fn state_by_name(&self, name: &str) -> Option<&State> {
        self.states.values().find(|s| s.name() == name)
    }

    /// All states in order
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    /// Get the number of states
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// State new instances start in
    pub fn initial_state(&self) -> Option<StateId> {
        self.initial_state
    }

    /// Choose the state new instances start in
    pub fn set_initial_state(&mut self, state_id: StateId) -> Result<(), EditError> {
        if !self.states.contains_key(&state_id) {
            return Err(EditError::StateNotFound(state_id));
        }
        self.initial_state = Some(state_id);
        Ok(())
    }

    /// Declare a variable, replacing any declaration with the same name
    pub fn declare_variable(&mut self, variable: VariableDef) -> Option<VariableDef> {
        self.variables.insert(variable.name.clone(), variable)
    }

    /// Remove a variable declaration
    pub fn remove_variable(&mut self, name: &str) -> Option<VariableDef> {
        self.variables.shift_remove(name)
    }

    /// Get a variable declaration
    pub fn variable(&self, name: &str) -> Option<&VariableDef> {
        self.variables.get(name)
    }

    /// All variable declarations in order
    pub fn variables(&self) -> impl Iterator<Item = &VariableDef> {
        self.variables.values()
    }

    /// Find a node and the state owning it
    pub fn find_node(&self, node_id: NodeId) -> Option<(&State, &Node)> {
        self.states
            .values()
            .find_map(|state| state.node(node_id).map(|node| (state, node)))
    }

    /// Get a node anywhere in the script
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.find_node(node_id).map(|(_, node)| node)
    }

    /// Get a mutable node anywhere in the script
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.states
            .values_mut()
            .find_map(|state| state.node_mut(node_id))
    }

    fn owner_of(&self, node_id: NodeId) -> Option<StateId> {
        self.find_node(node_id).map(|(state, _)| state.id())
    }

    /// Add a detached node to a state. Node identity is unique across the script.
    pub fn add_node(&mut self, state_id: StateId, node: Node) -> Result<NodeId, EditError> {
        if self.owner_of(node.id()).is_some() {
            return Err(EditError::DuplicateNode(node.id()));
        }
        self.states
            .get_mut(&state_id)
            .ok_or(EditError::StateNotFound(state_id))?
            .add_node(node)
    }

    /// Remove a node from whichever state owns it. No-op when absent.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let owner = self.owner_of(node_id)?;
        self.states.get_mut(&owner)?.remove_node(node_id)
    }

    /// Clone a node into a state
    pub fn clone_node(&mut self, node_id: NodeId, target: StateId) -> Result<NodeId, EditError> {
        let copy = self
            .node(node_id)
            .ok_or(EditError::NodeNotFound(node_id))?
            .clone_detached();
        self.add_node(target, copy)
    }

    /// Clone a state with fresh identities under a new name
    pub fn clone_state(&mut self, state_id: StateId, name: impl Into<String>) -> Result<StateId, EditError> {
        let copy = self
            .states
            .get(&state_id)
            .ok_or(EditError::StateNotFound(state_id))?
            .clone_detached(name);
        self.insert_state(copy)
    }

    /// Connect two ports. Both nodes must live in the same state.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Result<ConnectionId, EditError> {
        let from_state = self
            .owner_of(from_node)
            .ok_or(StructuralError::NodeNotFound(from_node))?;
        let to_state = self
            .owner_of(to_node)
            .ok_or(StructuralError::NodeNotFound(to_node))?;
        if from_state != to_state {
            return Err(StructuralError::CrossState {
                from: from_node,
                to: to_node,
            }
            .into());
        }

        let state = self
            .states
            .get_mut(&from_state)
            .ok_or(EditError::StateNotFound(from_state))?;
        Ok(state.connect(from_node, from_port, to_node, to_port)?)
    }

    /// Remove a non-fixed port from a node along with its connections
    pub fn remove_port(&mut self, node_id: NodeId, port_id: PortId) -> Result<Port, EditError> {
        let owner = self.owner_of(node_id).ok_or(EditError::NodeNotFound(node_id))?;
        self.states
            .get_mut(&owner)
            .ok_or(EditError::StateNotFound(owner))?
            .remove_port(node_id, port_id)
    }

    /// Set the literal default of a value input; `None` clears it
    pub fn set_port_default(
        &mut self,
        node_id: NodeId,
        port_id: PortId,
        value: Option<Value>,
    ) -> Result<(), EditError> {
        let owner = self.owner_of(node_id).ok_or(EditError::NodeNotFound(node_id))?;
        self.states
            .get_mut(&owner)
            .ok_or(EditError::StateNotFound(owner))?
            .set_port_default(node_id, port_id, value)
    }

    /// Drop dangling connections in every state, returning how many were removed
    pub fn prune_dangling(&mut self) -> usize {
        self.states.values_mut().map(State::prune_dangling).sum()
    }

    /// Remove a connection from whichever state owns it
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let owner = self
            .states
            .values()
            .find(|s| s.connection(connection_id).is_some())?
            .id();
        self.states.get_mut(&owner)?.disconnect(connection_id)
    }

    /// Take pending change notifications from every state and node
    pub fn drain_changes(&mut self) -> Vec<Change> {
        self.states
            .values_mut()
            .flat_map(State::drain_changes)
            .collect()
    }

    /// Report problems that degrade execution without making it fail
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.states.is_empty() {
            issues.push(ValidationIssue::NoStates);
        }

        for state in self.states.values() {
            for node in state.nodes() {
                match node.kind() {
                    NodeKind::Variable { variable } if !self.variables.contains_key(variable) => {
                        issues.push(ValidationIssue::UnknownVariable {
                            node: node.id(),
                            variable: variable.clone(),
                        });
                    }
                    NodeKind::StateSwitch { target: None } => {
                        issues.push(ValidationIssue::MissingSwitchTarget { node: node.id() });
                    }
                    NodeKind::StateSwitch {
                        target: Some(target),
                    } if !self.states.contains_key(target) => {
                        issues.push(ValidationIssue::UnknownSwitchTarget {
                            node: node.id(),
                            target: *target,
                        });
                    }
                    _ => {}
                }
            }

            for connection in state.connections().filter(|c| state.is_dangling(c)) {
                issues.push(ValidationIssue::DanglingConnection {
                    state: state.id(),
                    connection: connection.id,
                });
            }
        }

        issues
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeKind;

    fn action(name: &str) -> Node {
        Node::new(NodeKind::Action {
            action: name.to_string(),
        })
    }

    #[test]
    fn test_first_state_is_initial() {
        let mut script = Script::new("Door");
        let closed = script.add_state("Closed");
        let open = script.add_state("Open");
        assert_eq!(script.initial_state(), Some(closed));

        script.remove_state(closed);
        assert_eq!(script.initial_state(), Some(open));
        assert!(script.set_initial_state(closed).is_err());
    }

    #[test]
    fn test_node_identity_unique_across_states() {
        let mut script = Script::new("Door");
        let closed = script.add_state("Closed");
        let open = script.add_state("Open");

        let node = action("Creak");
        let id = script.add_node(closed, node).unwrap();

        let removed = script.remove_node(id).unwrap();
        script.add_node(open, removed).unwrap();
        assert_eq!(script.find_node(id).unwrap().0.id(), open);

        let mut twin = script.node(id).unwrap().clone();
        twin.set_state(None);
        assert_eq!(script.add_node(closed, twin), Err(EditError::DuplicateNode(id)));
    }

    #[test]
    fn test_cloned_node_cannot_join_a_second_state() {
        let mut script = Script::new("Door");
        let closed = script.add_state("Closed");
        let id = script.add_node(closed, action("Creak")).unwrap();

        // A state taken out of the script must not bring back a twin
        let mut detached = State::new("Ajar");
        let mut twin = script.node(id).unwrap().clone();
        twin.set_state(None);
        detached.add_node(twin).unwrap();
        assert_eq!(script.insert_state(detached), Err(EditError::DuplicateNode(id)));

        let restored = Script::from_ron(&script.to_ron().unwrap()).unwrap();
        assert_eq!(restored.state(closed).unwrap().node_count(), 1);
    }

    #[test]
    fn test_port_edits_through_script() {
        let mut script = Script::new("Door");
        let closed = script.add_state("Closed");
        let node = action("Creak").with_port(Port::value_in("Volume", ValueType::Float));
        let volume = node.port_named("Volume").unwrap().id();
        let id = script.add_node(closed, node).unwrap();

        script.set_port_default(id, volume, Some(Value::Float(0.5))).unwrap();
        assert_eq!(
            script.node(id).unwrap().port(volume).unwrap().effective_default(),
            Some(&Value::Float(0.5))
        );

        let fixed = script.node(id).unwrap().ports()[0].id();
        assert!(script.remove_port(id, fixed).is_err());
        script.remove_port(id, volume).unwrap();
        assert!(script.node(id).unwrap().port(volume).is_none());

        let missing = NodeId::new();
        assert!(matches!(
            script.remove_port(missing, volume),
            Err(EditError::NodeNotFound(id)) if id == missing
        ));
    }

    #[test]
    fn test_connect_rejects_cross_state() {
        let mut script = Script::new("Door");
        let closed = script.add_state("Closed");
        let open = script.add_state("Open");
        let a = script.add_node(closed, action("A")).unwrap();
        let b = script.add_node(open, action("B")).unwrap();

        let from = script.node(a).unwrap().ports()[1].id();
        let to = script.node(b).unwrap().ports()[0].id();
        assert_eq!(
            script.connect(a, from, b, to),
            Err(EditError::Structural(StructuralError::CrossState { from: a, to: b }))
        );
    }

    #[test]
    fn test_clone_node_and_state() {
        let mut script = Script::new("Door");
        let closed = script.add_state("Closed");
        let a = script.add_node(closed, action("A")).unwrap();
        let b = script.add_node(closed, action("B")).unwrap();
        let from = script.node(a).unwrap().ports()[1].id();
        let to = script.node(b).unwrap().ports()[0].id();
        script.connect(a, from, b, to).unwrap();

        let copy = script.clone_node(a, closed).unwrap();
        assert_ne!(copy, a);
        assert_eq!(script.state(closed).unwrap().node_count(), 3);

        let locked = script.clone_state(closed, "Locked").unwrap();
        let locked_state = script.state(locked).unwrap();
        assert_eq!(locked_state.node_count(), 3);
        assert_eq!(locked_state.connection_count(), 1);
        assert_eq!(script.state(closed).unwrap().connection_count(), 1);
    }

    #[test]
    fn test_validate_reports_issues() {
        let mut script = Script::new("Door");
        let closed = script.add_state("Closed");
        script
            .add_node(
                closed,
                Node::new(NodeKind::Variable {
                    variable: "health".to_string(),
                }),
            )
            .unwrap();
        script
            .add_node(closed, Node::new(NodeKind::StateSwitch { target: None }))
            .unwrap();

        let issues = script.validate();
        assert_eq!(issues.len(), 2);

        script.declare_variable(VariableDef::new("health", ValueType::Int));
        assert_eq!(script.validate().len(), 1);
        assert_eq!(
            script.variable("health").unwrap().initial_value(),
            Some(Value::Int(0))
        );
    }

    #[test]
    fn test_drain_changes_collects_nodes() {
        let mut script = Script::new("Door");
        let closed = script.add_state("Closed");
        let a = script.add_node(closed, action("A")).unwrap();

        script.node_mut(a).unwrap().set_location([5.0, 5.0]);
        assert!(script.rename_state(closed, "Shut").unwrap());
        assert!(!script.rename_state(closed, "Shut").unwrap());

        let changes = script.drain_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].kind, ChangeKind::NameChanged);
        assert_eq!(changes[1].kind, ChangeKind::LocationChanged);
        assert!(script.drain_changes().is_empty());
    }
}
