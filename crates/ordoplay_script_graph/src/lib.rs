// SPDX-License-Identifier: MIT OR Apache-2.0
//! Visual scripting for `OrdoPlay` game objects.
//!
//! A [`Script`] is a state machine whose states each hold a graph of nodes.
//! Nodes expose event ports (control flow) and typed value ports (data),
//! wired together with connections inside one state.
//!
//! ## Architecture
//!
//! - Model: [`Script`] → [`State`] → [`Node`] → [`Port`], plus [`Connection`]s
//! - Runtime: an [`Instance`] per game object fires named events through the
//!   current state, performing actions on a [`ScriptHost`]
//! - Documents: versioned RON/JSON persistence
//! - Editor support: views, property rows, change notifications, a node
//!   palette and undo/redo history

pub mod change;
pub mod connection;
pub mod document;
pub mod history;
pub mod node;
pub mod port;
pub mod property;
pub mod registry;
pub mod runtime;
pub mod script;
pub mod state;
pub mod view;

pub use change::{Change, ChangeKind, ChangeSubject};
pub use connection::{Connection, ConnectionId, StructuralError};
pub use document::{DocumentError, ScriptDocument, SCRIPT_FORMAT_VERSION};
pub use history::{History, HistoryError};
pub use node::{CompareOp, Node, NodeCategory, NodeId, NodeKind};
pub use port::{Port, PortDirection, PortId, PortKind, Value, ValueType};
pub use property::{PropertyError, PropertyRow};
pub use registry::{create_gameplay_registry, NodeRegistry, NodeTemplate};
pub use runtime::{Instance, PassOutput, ScriptHost};
pub use script::{Script, ScriptId, ValidationIssue, VariableDef};
pub use state::{EditError, State, StateId};
pub use view::{ConnectionView, NodeView, PortView};
