// SPDX-License-Identifier: MIT OR Apache-2.0
//! The game-side host that receives a script's side effects.

use crate::port::Value;
use std::collections::{HashMap, HashSet};

/// A named argument passed to a host action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionArgument {
    /// Input port name
    pub name: String,
    /// Pulled value
    pub value: Value,
}

/// Failure reported by the host while performing an action
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    /// Create a new host error
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Game-object side of a running script
pub trait ScriptHost {
    /// Perform a named action. A returned value becomes the node's result output.
    fn perform(&mut self, action: &str, args: &[ActionArgument]) -> Result<Option<Value>, HostError>;

    /// Receive an event raised by an emitter node
    fn emit(&mut self, _event: &str) {}
}

/// Host that ignores every effect
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl ScriptHost for NullHost {
    fn perform(&mut self, _action: &str, _args: &[ActionArgument]) -> Result<Option<Value>, HostError> {
        Ok(None)
    }
}

/// A performed action, as recorded by [`RecordingHost`]
#[derive(Debug, Clone, PartialEq)]
pub struct PerformedAction {
    /// Action name
    pub action: String,
    /// Arguments in port order
    pub args: Vec<ActionArgument>,
}

/// Host that records effects, for tools and tests
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    /// Actions in the order they were performed
    pub performed: Vec<PerformedAction>,
    /// Emitted events in order
    pub emitted: Vec<String>,
    failing: HashSet<String>,
    results: HashMap<String, Value>,
}

impl RecordingHost {
    /// Create an empty recording host
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an action fail whenever it is performed
    pub fn fail_on(mut self, action: impl Into<String>) -> Self {
        self.failing.insert(action.into());
        self
    }

    /// Make an action return a result value
    pub fn returning(mut self, action: impl Into<String>, value: Value) -> Self {
        self.results.insert(action.into(), value);
        self
    }

    /// Names of performed actions in order
    pub fn action_names(&self) -> Vec<&str> {
        self.performed.iter().map(|p| p.action.as_str()).collect()
    }

    /// How many times an action was performed
    pub fn count(&self, action: &str) -> usize {
        self.performed.iter().filter(|p| p.action == action).count()
    }
}

impl ScriptHost for RecordingHost {
    fn perform(&mut self, action: &str, args: &[ActionArgument]) -> Result<Option<Value>, HostError> {
        if self.failing.contains(action) {
            return Err(HostError::new(format!("action '{action}' failed")));
        }
        self.performed.push(PerformedAction {
            action: action.to_string(),
            args: args.to_vec(),
        });
        Ok(self.results.get(action).cloned())
    }

    fn emit(&mut self, event: &str) {
        self.emitted.push(event.to_string());
    }
}
