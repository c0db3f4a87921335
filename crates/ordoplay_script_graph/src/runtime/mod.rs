// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime execution of scripts.
//!
//! An [`Instance`] pairs a shared, read-only [`Script`] with its own current
//! state and variable storage. [`Instance::fire_event`] runs one propagation
//! pass: a depth-first walk from every matching event receiver, guarded so
//! no node runs twice, with per-node failure isolation.
//!
//! [`Script`]: crate::script::Script

mod action;
mod condition;
mod context;
mod diagnostics;
mod emitter;
mod host;
mod instance;
mod passthrough;
mod state_switch;
mod variable;

pub use action::*;
pub use condition::*;
pub use context::*;
pub use diagnostics::*;
pub use emitter::*;
pub use host::*;
pub use instance::*;
pub use passthrough::*;
pub use state_switch::*;
pub use variable::*;

use crate::node::{Node, NodeId, NodeKind};
use crate::port::{PortId, Value, ValueType};
use crate::state::StateId;

/// Failure inside a single node's effect
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EffectError {
    /// An input has no connection, usable source or default
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// A port required by the node kind was removed or never existed
    #[error("Missing port: {0}")]
    MissingPort(&'static str),

    /// A value could not be converted to the expected type
    #[error("Type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        /// Expected type
        expected: ValueType,
        /// Actual type
        found: ValueType,
    },

    /// Values cannot be ordered against each other
    #[error("Cannot compare {left:?} with {right:?}")]
    Incomparable {
        /// Left operand type
        left: ValueType,
        /// Right operand type
        right: ValueType,
    },

    /// The script declares no such variable
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// The variable is declared but has no value yet
    #[error("Variable has no value: {0}")]
    UnsetVariable(String),

    /// A state switch without a target
    #[error("State switch has no target")]
    MissingSwitchTarget,

    /// The target state does not exist
    #[error("Unknown state: {0:?}")]
    UnknownState(StateId),

    /// The host rejected an action
    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// Something that happened during a propagation pass
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    /// A node was executed
    EnterNode(NodeId),
    /// A host action was performed
    ActionPerformed {
        /// Action node
        node: NodeId,
        /// Action name
        action: String,
    },
    /// An emitter raised an event
    EventEmitted {
        /// Emitter node
        node: NodeId,
        /// Event name
        event: String,
    },
    /// A variable was assigned
    VariableWritten {
        /// Variable name
        name: String,
        /// New value
        value: Value,
    },
    /// A switch was requested; it applies when the pass completes
    SwitchRequested {
        /// Switch node
        node: NodeId,
        /// Target state
        target: StateId,
    },
    /// The current state changed after the pass
    StateSwitched {
        /// Previous state
        from: StateId,
        /// New state
        to: StateId,
    },
}

/// Result of one propagation pass
#[derive(Debug, Clone, Default)]
pub struct PassOutput {
    /// Fired event name
    pub event: String,
    /// What happened, in order
    pub events: Vec<ExecutionEvent>,
    /// Node failures reported during the pass
    pub diagnostics: Vec<Diagnostic>,
    /// State entered after the pass, if a switch was applied
    pub switched_to: Option<StateId>,
}

impl PassOutput {
    /// Executed nodes in order
    pub fn executed(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.events.iter().filter_map(|e| match e {
            ExecutionEvent::EnterNode(id) => Some(*id),
            _ => None,
        })
    }

    /// Whether any node executed
    pub fn is_empty(&self) -> bool {
        self.executed().next().is_none()
    }
}

/// Variant-specific effect of a node
pub trait NodeEffect: Send + Sync {
    /// Run the node's effect and return the event outputs to follow, in order.
    fn execute(&self, ctx: &mut PassContext<'_>, node: &Node) -> Result<Vec<PortId>, EffectError>;
}

static PASSTHROUGH: PassthroughEffect = PassthroughEffect;
static ACTION: ActionEffect = ActionEffect;
static CONDITION: ConditionEffect = ConditionEffect;
static VARIABLE: VariableEffect = VariableEffect;
static EMITTER: EmitterEffect = EmitterEffect;
static STATE_SWITCH: StateSwitchEffect = StateSwitchEffect;

/// Effect implementation for a node kind
pub fn effect_for(kind: &NodeKind) -> &'static dyn NodeEffect {
    match kind {
        NodeKind::Action { .. } => &ACTION,
        NodeKind::Condition { .. } => &CONDITION,
        NodeKind::Variable { .. } => &VARIABLE,
        NodeKind::EventEmitter { .. } => &EMITTER,
        NodeKind::StateSwitch { .. } => &STATE_SWITCH,

        // Entry points and pure data nodes only pass flow on
        NodeKind::EventReceiver { .. } | NodeKind::Constant { .. } => &PASSTHROUGH,
    }
}
