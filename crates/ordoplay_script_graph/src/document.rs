// SPDX-License-Identifier: MIT OR Apache-2.0
//! Versioned document format for scripts.
//!
//! [`ScriptDocument`] is the persisted shape of a [`Script`]: plain serde
//! structs with every collection in order. Documents are written as pretty
//! RON by default, or JSON when the file extension says so. Decoding builds
//! every state and node before resolving connections, and keeps connections
//! whose endpoints are missing as dangling references.

use crate::connection::{Connection, ConnectionId, StructuralError};
use crate::node::{CompareOp, Node, NodeId, NodeKind};
use crate::port::{Port, PortDirection, PortId, PortKind, Value, ValueType};
use crate::script::{Script, ScriptId, VariableDef};
use crate::state::{EditError, State, StateId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Current document format version
pub const SCRIPT_FORMAT_VERSION: u32 = 1;

/// Errors while encoding or decoding a script document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The document was written by a newer format version
    #[error("Unsupported script format version {found} (supported up to {supported})")]
    UnsupportedVersion {
        /// Version found in the document
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },

    /// Two states share an ID
    #[error("Duplicate state ID: {0:?}")]
    DuplicateState(StateId),

    /// Two connections share an ID
    #[error("Duplicate connection ID: {0:?}")]
    DuplicateConnection(ConnectionId),

    /// JSON has no representation for infinity or NaN
    #[error("Non-finite number in {0} cannot be written as JSON")]
    NonFiniteFloat(String),

    /// The document describes an invalid model
    #[error("Invalid script: {0}")]
    Edit(#[from] EditError),

    /// A stored connection breaks the wiring rules
    #[error("Invalid connection: {0}")]
    Structural(#[from] StructuralError),

    /// RON encoding failed
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// RON decoding failed
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persisted script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptDocument {
    /// Format version
    pub version: u32,
    /// Script ID
    pub id: ScriptId,
    /// Script name
    pub name: String,
    /// State new instances start in
    pub initial_state: Option<StateId>,
    /// Variable declarations in order
    pub variables: Vec<VariableDoc>,
    /// States in order
    pub states: Vec<StateDoc>,
}

impl Default for ScriptDocument {
    fn default() -> Self {
        Self {
            version: SCRIPT_FORMAT_VERSION,
            id: ScriptId::new(),
            name: String::from("Untitled"),
            initial_state: None,
            variables: Vec::new(),
            states: Vec::new(),
        }
    }
}

/// Persisted variable declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDoc {
    /// Variable name
    pub name: String,
    /// Declared type
    pub value_type: ValueType,
    /// Starting value
    #[serde(default)]
    pub default: Option<Value>,
}

/// Persisted state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDoc {
    /// State ID
    pub id: StateId,
    /// State name
    pub name: String,
    /// Nodes in order
    #[serde(default)]
    pub nodes: Vec<NodeDoc>,
    /// Connections in order
    #[serde(default)]
    pub connections: Vec<ConnectionDoc>,
}

/// Persisted node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDoc {
    /// Node ID
    pub id: NodeId,
    /// Variant and parameters
    pub kind: NodeKindDoc,
    /// Canvas location
    #[serde(default)]
    pub location: [f32; 2],
    /// Editor comment
    #[serde(default)]
    pub comment: String,
    /// Ports in order
    #[serde(default)]
    pub ports: Vec<PortDoc>,
}

/// Persisted node variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKindDoc {
    /// See [`NodeKind::EventReceiver`]
    EventReceiver {
        /// Event name
        event: String,
    },
    /// See [`NodeKind::EventEmitter`]
    EventEmitter {
        /// Event name
        event: String,
    },
    /// See [`NodeKind::Action`]
    Action {
        /// Action name
        action: String,
    },
    /// See [`NodeKind::Condition`]
    Condition {
        /// Comparison
        op: CompareOp,
    },
    /// See [`NodeKind::Variable`]
    Variable {
        /// Variable name
        variable: String,
    },
    /// See [`NodeKind::Constant`]
    Constant {
        /// The value
        value: Value,
    },
    /// See [`NodeKind::StateSwitch`]
    StateSwitch {
        /// Target state
        target: Option<StateId>,
    },
}

impl From<&NodeKind> for NodeKindDoc {
    fn from(kind: &NodeKind) -> Self {
        match kind.clone() {
            NodeKind::EventReceiver { event } => Self::EventReceiver { event },
            NodeKind::EventEmitter { event } => Self::EventEmitter { event },
            NodeKind::Action { action } => Self::Action { action },
            NodeKind::Condition { op } => Self::Condition { op },
            NodeKind::Variable { variable } => Self::Variable { variable },
            NodeKind::Constant { value } => Self::Constant { value },
            NodeKind::StateSwitch { target } => Self::StateSwitch { target },
        }
    }
}

impl From<NodeKindDoc> for NodeKind {
    fn from(doc: NodeKindDoc) -> Self {
        match doc {
            NodeKindDoc::EventReceiver { event } => Self::EventReceiver { event },
            NodeKindDoc::EventEmitter { event } => Self::EventEmitter { event },
            NodeKindDoc::Action { action } => Self::Action { action },
            NodeKindDoc::Condition { op } => Self::Condition { op },
            NodeKindDoc::Variable { variable } => Self::Variable { variable },
            NodeKindDoc::Constant { value } => Self::Constant { value },
            NodeKindDoc::StateSwitch { target } => Self::StateSwitch { target },
        }
    }
}

/// Persisted port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDoc {
    /// Port ID
    pub id: PortId,
    /// Port name
    pub name: String,
    /// Direction
    pub direction: PortDirection,
    /// Event or typed value
    pub kind: PortKind,
    /// Literal default for value inputs
    #[serde(default)]
    pub default: Option<Value>,
    /// Whether the default is used
    #[serde(default)]
    pub default_enabled: bool,
}

/// Persisted connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDoc {
    /// Connection ID
    pub id: ConnectionId,
    /// Source node
    pub from_node: NodeId,
    /// Source port
    pub from_port: PortId,
    /// Target node
    pub to_node: NodeId,
    /// Target port
    pub to_port: PortId,
}

impl From<&Port> for PortDoc {
    fn from(port: &Port) -> Self {
        Self {
            id: port.id,
            name: port.name.clone(),
            direction: port.direction,
            kind: port.kind,
            default: port.default.clone(),
            default_enabled: port.default_enabled,
        }
    }
}

impl From<PortDoc> for Port {
    fn from(doc: PortDoc) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            index: 0,
            direction: doc.direction,
            kind: doc.kind,
            default: doc.default,
            default_enabled: doc.default_enabled,
        }
    }
}

impl From<&Connection> for ConnectionDoc {
    fn from(c: &Connection) -> Self {
        Self {
            id: c.id,
            from_node: c.from_node,
            from_port: c.from_port,
            to_node: c.to_node,
            to_port: c.to_port,
        }
    }
}

impl From<ConnectionDoc> for Connection {
    fn from(doc: ConnectionDoc) -> Self {
        Self {
            id: doc.id,
            from_node: doc.from_node,
            from_port: doc.from_port,
            to_node: doc.to_node,
            to_port: doc.to_port,
        }
    }
}

fn node_doc(node: &Node) -> NodeDoc {
    NodeDoc {
        id: node.id(),
        kind: node.kind().into(),
        location: node.location(),
        comment: node.comment().to_string(),
        ports: node.ports().iter().map(PortDoc::from).collect(),
    }
}

impl Script {
    /// Capture the script as a document
    pub fn to_document(&self) -> ScriptDocument {
        ScriptDocument {
            version: SCRIPT_FORMAT_VERSION,
            id: self.id(),
            name: self.name.clone(),
            initial_state: self.initial_state(),
            variables: self
                .variables()
                .map(|v| VariableDoc {
                    name: v.name.clone(),
                    value_type: v.value_type,
                    default: v.default.clone(),
                })
                .collect(),
            states: self
                .states()
                .map(|state| StateDoc {
                    id: state.id(),
                    name: state.name().to_string(),
                    nodes: state.nodes().map(node_doc).collect(),
                    connections: state.connections().map(ConnectionDoc::from).collect(),
                })
                .collect(),
        }
    }

    /// Rebuild a script from a document
    pub fn from_document(doc: ScriptDocument) -> Result<Self, DocumentError> {
        if doc.version > SCRIPT_FORMAT_VERSION {
            return Err(DocumentError::UnsupportedVersion {
                found: doc.version,
                supported: SCRIPT_FORMAT_VERSION,
            });
        }

        let mut script = Script::with_id(doc.id, doc.name);
        for variable in doc.variables {
            script.declare_variable(VariableDef {
                name: variable.name,
                value_type: variable.value_type,
                default: variable.default,
            });
        }

        // Nodes first, so every connection can see both of its endpoints
        let mut pending = Vec::with_capacity(doc.states.len());
        for state_doc in doc.states {
            if script.state(state_doc.id).is_some() {
                return Err(DocumentError::DuplicateState(state_doc.id));
            }
            let mut state = State::with_id(state_doc.id, state_doc.name);
            for node in state_doc.nodes {
                let ports = node.ports.into_iter().map(Port::from).collect();
                state.add_node(Node::from_parts(
                    node.id,
                    node.kind.into(),
                    node.location,
                    node.comment,
                    ports,
                ))?;
            }
            let id = script.insert_state(state)?;
            pending.push((id, state_doc.connections));
        }

        let mut seen = HashSet::new();
        for (state_id, connections) in pending {
            let state = script
                .state_mut(state_id)
                .ok_or(EditError::StateNotFound(state_id))?;
            for connection in connections {
                if !seen.insert(connection.id) {
                    return Err(DocumentError::DuplicateConnection(connection.id));
                }
                state.restore_connection(connection.into())?;
            }
            let dangling = state.connections().filter(|c| state.is_dangling(c)).count();
            if dangling > 0 {
                tracing::warn!(state = state.name(), dangling, "document has dangling connections");
            }
        }

        if let Some(initial) = doc.initial_state {
            script.set_initial_state(initial)?;
        }

        tracing::debug!(script = %script.name, states = script.state_count(), "script decoded");
        Ok(script)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, DocumentError> {
        Ok(ron::ser::to_string_pretty(
            &self.to_document(),
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Deserialize from RON
    pub fn from_ron(s: &str) -> Result<Self, DocumentError> {
        Self::from_document(ron::from_str(s)?)
    }

    /// Serialize to pretty JSON. Infinite and NaN floats are rejected since
    /// JSON would store them as `null`.
    pub fn to_json(&self) -> Result<String, DocumentError> {
        let doc = self.to_document();
        if let Some(place) = non_finite(&doc) {
            return Err(DocumentError::NonFiniteFloat(place));
        }
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Deserialize from JSON
    pub fn from_json(s: &str) -> Result<Self, DocumentError> {
        Self::from_document(serde_json::from_str(s)?)
    }

    /// Save to a file; `.json` files are written as JSON, anything else as RON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        let content = if is_json(path) {
            self.to_json()?
        } else {
            self.to_ron()?
        };
        std::fs::write(path, content)?;
        tracing::info!(path = %path.display(), "script saved");
        Ok(())
    }

    /// Load from a file written by [`Script::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let script = if is_json(path) {
            Self::from_json(&content)?
        } else {
            Self::from_ron(&content)?
        };
        tracing::info!(path = %path.display(), script = %script.name, "script loaded");
        Ok(script)
    }
}

fn is_finite(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Float(f)) => f.is_finite(),
        Some(Value::Vector2(v)) => v.iter().all(|c| c.is_finite()),
        Some(Value::Vector3(v)) => v.iter().all(|c| c.is_finite()),
        _ => true,
    }
}

/// Describe the first float JSON cannot hold, if any
fn non_finite(doc: &ScriptDocument) -> Option<String> {
    if let Some(variable) = doc.variables.iter().find(|v| !is_finite(v.default.as_ref())) {
        return Some(format!("variable '{}'", variable.name));
    }

    for node in doc.states.iter().flat_map(|state| &state.nodes) {
        if node.location.iter().any(|c| !c.is_finite()) {
            return Some(format!("location of node {:?}", node.id));
        }
        if let NodeKindDoc::Constant { value } = &node.kind {
            if !is_finite(Some(value)) {
                return Some(format!("constant node {:?}", node.id));
            }
        }
        if let Some(port) = node.ports.iter().find(|p| !is_finite(p.default.as_ref())) {
            return Some(format!("default of port '{}'", port.name));
        }
    }
    None
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
