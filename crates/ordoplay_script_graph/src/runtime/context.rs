// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-pass evaluation context: on-demand input pulling, cached outputs and
//! the deferred state switch.

use crate::connection::Connection;
use crate::node::{Node, NodeId, NodeKind};
use crate::port::{Port, PortDirection, PortId, Value};
use crate::runtime::{ActionArgument, EffectError, ExecutionEvent, ScriptHost};
use crate::script::Script;
use crate::state::{State, StateId};
use std::collections::{BTreeMap, HashMap};

/// Context shared by node effects during one propagation pass
pub struct PassContext<'a> {
    script: &'a Script,
    state: &'a State,
    variables: &'a mut BTreeMap<String, Value>,
    host: &'a mut dyn ScriptHost,
    /// Output values produced by nodes that already ran this pass
    outputs: HashMap<PortId, Value>,
    pending_switch: Option<StateId>,
    events: Vec<ExecutionEvent>,
}

impl<'a> PassContext<'a> {
    pub(crate) fn new(
        script: &'a Script,
        state: &'a State,
        variables: &'a mut BTreeMap<String, Value>,
        host: &'a mut dyn ScriptHost,
    ) -> Self {
        Self {
            script,
            state,
            variables,
            host,
            outputs: HashMap::new(),
            pending_switch: None,
            events: Vec::new(),
        }
    }

    /// The script being executed
    pub fn script(&self) -> &Script {
        self.script
    }

    /// The state the pass runs in
    pub fn state(&self) -> &State {
        self.state
    }

    /// Event outputs of a node, in port order
    pub fn event_outputs(&self, node: &Node) -> Vec<PortId> {
        node.outputs()
            .filter(|p| p.is_event())
            .map(Port::id)
            .collect()
    }

    /// The `n`-th event output of a node
    pub fn event_output(&self, node: &Node, n: usize, role: &'static str) -> Result<PortId, EffectError> {
        node.nth_port(PortDirection::Output, true, n)
            .map(Port::id)
            .ok_or(EffectError::MissingPort(role))
    }

    /// Pull the `n`-th value input of a node
    pub fn input_at(&self, node: &Node, n: usize, role: &'static str) -> Result<Value, EffectError> {
        let port = node
            .nth_port(PortDirection::Input, false, n)
            .ok_or(EffectError::MissingPort(role))?;
        self.read_input(port)
    }

    /// Pull a value input: the connected source if it has a value, else the
    /// enabled literal default. The result is converted to the port's type.
    pub fn read_input(&self, port: &Port) -> Result<Value, EffectError> {
        let mut pulled = None;
        for connection in self.state.connections_to(port.id()) {
            if let Some(value) = self.pull(connection)? {
                pulled = Some(value);
                break;
            }
        }

        let value = pulled
            .or_else(|| port.effective_default().cloned())
            .ok_or_else(|| EffectError::MissingInput(port.name().to_string()))?;

        match port.kind().value_type() {
            Some(expected) => value.coerce_to(expected).ok_or(EffectError::TypeMismatch {
                expected,
                found: value.value_type(),
            }),
            None => Err(EffectError::MissingInput(port.name().to_string())),
        }
    }

    fn pull(&self, connection: &Connection) -> Result<Option<Value>, EffectError> {
        let Some(source) = self.state.node(connection.from_node) else {
            tracing::trace!(connection = ?connection.id, "skipping dangling data connection");
            return Ok(None);
        };

        match source.kind() {
            NodeKind::Variable { variable } => self
                .variables
                .get(variable)
                .cloned()
                .map(Some)
                .ok_or_else(|| EffectError::UnsetVariable(variable.clone())),
            NodeKind::Constant { value } => Ok(Some(value.clone())),
            _ => Ok(self.outputs.get(&connection.from_port).cloned()),
        }
    }

    /// Current value of a variable
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Assign a declared variable, converting to its declared type
    pub fn write_variable(&mut self, name: &str, value: Value) -> Result<(), EffectError> {
        let def = self
            .script
            .variable(name)
            .ok_or_else(|| EffectError::UnknownVariable(name.to_string()))?;
        let value = value
            .coerce_to(def.value_type)
            .ok_or(EffectError::TypeMismatch {
                expected: def.value_type,
                found: value.value_type(),
            })?;

        self.variables.insert(name.to_string(), value.clone());
        self.events.push(ExecutionEvent::VariableWritten {
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    /// Store an output value for downstream inputs pulled later in the pass
    pub fn set_output(&mut self, port: PortId, value: Value) {
        self.outputs.insert(port, value);
    }

    /// Perform a host action
    pub fn perform(
        &mut self,
        node: NodeId,
        action: &str,
        args: &[ActionArgument],
    ) -> Result<Option<Value>, EffectError> {
        let result = self.host.perform(action, args)?;
        self.events.push(ExecutionEvent::ActionPerformed {
            node,
            action: action.to_string(),
        });
        Ok(result)
    }

    /// Raise an outbound event to the host
    pub fn emit(&mut self, node: NodeId, event: &str) {
        self.host.emit(event);
        self.events.push(ExecutionEvent::EventEmitted {
            node,
            event: event.to_string(),
        });
    }

    /// Request a state switch, applied once the pass completes. The last
    /// request in a pass wins.
    pub fn request_switch(&mut self, node: NodeId, target: StateId) {
        if let Some(previous) = self.pending_switch.replace(target) {
            tracing::debug!(?previous, ?target, "state switch request overridden");
        }
        self.events.push(ExecutionEvent::SwitchRequested { node, target });
    }

    pub(crate) fn push_event(&mut self, event: ExecutionEvent) {
        self.events.push(event);
    }

    pub(crate) fn finish(self) -> (Vec<ExecutionEvent>, Option<StateId>) {
        (self.events, self.pending_switch)
    }
}
