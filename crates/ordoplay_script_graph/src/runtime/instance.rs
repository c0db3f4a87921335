// SPDX-License-Identifier: MIT OR Apache-2.0
//! Running script instances.

use crate::node::{Node, NodeId};
use crate::port::Value;
use crate::runtime::{
    effect_for, Diagnostic, DiagnosticsSink, EffectError, ExecutionEvent, PassContext, PassOutput,
    ScriptHost, TracingDiagnostics,
};
use crate::script::Script;
use crate::state::{EditError, StateId};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// One running copy of a script.
///
/// The script itself is shared and never mutated by execution; each instance
/// keeps its own current state and variable values.
pub struct Instance {
    script: Arc<Script>,
    current_state: Option<StateId>,
    variables: BTreeMap<String, Value>,
    diagnostics: Box<dyn DiagnosticsSink>,
}

impl Instance {
    /// Start an instance in the script's initial state with every variable
    /// at its declared default
    pub fn new(script: Arc<Script>) -> Self {
        let mut instance = Self {
            script,
            current_state: None,
            variables: BTreeMap::new(),
            diagnostics: Box::new(TracingDiagnostics),
        };
        instance.reset();
        instance
    }

    /// Route node failures to another sink
    pub fn with_diagnostics(mut self, sink: impl DiagnosticsSink + 'static) -> Self {
        self.diagnostics = Box::new(sink);
        self
    }

    /// The shared script
    pub fn script(&self) -> &Arc<Script> {
        &self.script
    }

    /// Current state
    pub fn current_state(&self) -> Option<StateId> {
        self.current_state
    }

    /// Name of the current state
    pub fn current_state_name(&self) -> Option<&str> {
        self.current_state
            .and_then(|id| self.script.state(id))
            .map(|state| state.name())
    }

    /// Jump to a state directly, outside of any pass
    pub fn set_current_state(&mut self, state_id: StateId) -> Result<(), EditError> {
        if self.script.state(state_id).is_none() {
            return Err(EditError::StateNotFound(state_id));
        }
        self.current_state = Some(state_id);
        Ok(())
    }

    /// Current value of a variable
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// All variable values, sorted by name
    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    /// Assign a declared variable from outside the graph
    pub fn set_variable(&mut self, name: &str, value: Value) -> Result<(), EffectError> {
        let def = self
            .script
            .variable(name)
            .ok_or_else(|| EffectError::UnknownVariable(name.to_string()))?;
        let value = value.coerce_to(def.value_type).ok_or(EffectError::TypeMismatch {
            expected: def.value_type,
            found: value.value_type(),
        })?;
        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    /// Back to the initial state and default variable values
    pub fn reset(&mut self) {
        self.current_state = self.script.initial_state();
        self.variables = self
            .script
            .variables()
            .filter_map(|def| def.initial_value().map(|value| (def.name.clone(), value)))
            .collect();
    }

    /// Fire a named event in the current state and run one propagation pass.
    ///
    /// Every event receiver listening to `event` is an entry point, taken in
    /// node order. Flow follows each fired output's connections depth-first
    /// in connection order and no node runs twice in one pass. A failing
    /// node is reported and its branch stops; other branches continue. A
    /// requested state switch applies after the pass.
    pub fn fire_event(&mut self, event: &str, host: &mut dyn ScriptHost) -> PassOutput {
        let mut output = PassOutput {
            event: event.to_string(),
            ..Default::default()
        };

        let Some(state_id) = self.current_state else {
            tracing::debug!(event, "no current state, event ignored");
            return output;
        };
        let script = Arc::clone(&self.script);
        let Some(state) = script.state(state_id) else {
            tracing::warn!(event, state = ?state_id, "current state no longer exists");
            return output;
        };

        let entries: Vec<NodeId> = state
            .nodes()
            .filter(|node| node.kind().listens_to(event))
            .map(Node::id)
            .collect();
        if entries.is_empty() {
            tracing::trace!(event, state = state.name(), "no receivers");
            return output;
        }

        tracing::debug!(event, state = state.name(), entries = entries.len(), "firing event");

        let mut ctx = PassContext::new(&script, state, &mut self.variables, host);
        let mut visited = HashSet::new();

        for entry in entries {
            let mut stack = vec![entry];
            while let Some(node_id) = stack.pop() {
                if !visited.insert(node_id) {
                    continue;
                }
                let Some(node) = state.node(node_id) else {
                    continue;
                };

                ctx.push_event(ExecutionEvent::EnterNode(node_id));
                match effect_for(node.kind()).execute(&mut ctx, node) {
                    Ok(fired) => {
                        let successors: Vec<NodeId> = fired
                            .iter()
                            .flat_map(|port| state.connections_from(*port))
                            .filter(|connection| {
                                let dangling = state.is_dangling(connection);
                                if dangling {
                                    tracing::trace!(connection = ?connection.id, "skipping dangling connection");
                                }
                                !dangling
                            })
                            .map(|connection| connection.to_node)
                            .collect();
                        stack.extend(successors.into_iter().rev());
                    }
                    Err(error) => {
                        let diagnostic = Diagnostic {
                            event: event.to_string(),
                            state: state_id,
                            node: node_id,
                            error,
                        };
                        self.diagnostics.report(&diagnostic);
                        output.diagnostics.push(diagnostic);
                    }
                }
            }
        }

        let (events, pending_switch) = ctx.finish();
        output.events = events;

        if let Some(target) = pending_switch {
            tracing::debug!(
                from = state.name(),
                to = script.state(target).map(|s| s.name()).unwrap_or_default(),
                "state switched"
            );
            self.current_state = Some(target);
            output.switched_to = Some(target);
            output.events.push(ExecutionEvent::StateSwitched {
                from: state_id,
                to: target,
            });
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::node::{CompareOp, NodeKind};
    use crate::port::{Port, PortId, ValueType};
    use crate::runtime::{DiagnosticsBuffer, RecordingHost};
    use crate::script::VariableDef;

    fn port(script: &Script, node: NodeId, name: &str) -> PortId {
        script.node(node).unwrap().port_named(name).unwrap().id()
    }

    fn link(script: &mut Script, from: NodeId, out: &str, to: NodeId, input: &str) {
        let from_port = port(script, from, out);
        let to_port = port(script, to, input);
        script.connect(from, from_port, to, to_port).unwrap();
    }

    fn receiver(script: &mut Script, state: StateId, event: &str) -> NodeId {
        let kind = NodeKind::EventReceiver {
            event: event.to_string(),
        };
        script.add_node(state, Node::new(kind)).unwrap()
    }

    fn action(script: &mut Script, state: StateId, name: &str) -> NodeId {
        let kind = NodeKind::Action {
            action: name.to_string(),
        };
        script.add_node(state, Node::new(kind)).unwrap()
    }

    fn switch(script: &mut Script, state: StateId, target: StateId) -> NodeId {
        let kind = NodeKind::StateSwitch {
            target: Some(target),
        };
        script.add_node(state, Node::new(kind)).unwrap()
    }

    /// Idle: Start -> PlayAnim -> switch to Running. Running: Start -> Run.
    fn idle_running() -> (Script, StateId, StateId) {
        let mut script = Script::new("Character");
        let idle = script.add_state("Idle");
        let running = script.add_state("Running");

        let start = receiver(&mut script, idle, "Start");
        let play = action(&mut script, idle, "PlayAnim");
        let to_running = switch(&mut script, idle, running);
        link(&mut script, start, "Out", play, "In");
        link(&mut script, play, "Then", to_running, "In");

        let start = receiver(&mut script, running, "Start");
        let run = action(&mut script, running, "Run");
        link(&mut script, start, "Out", run, "In");

        (script, idle, running)
    }

    #[test]
    fn test_event_switches_state_after_pass() {
        let (script, idle, running) = idle_running();
        let mut instance = Instance::new(Arc::new(script));
        let mut host = RecordingHost::new();
        assert_eq!(instance.current_state(), Some(idle));

        let output = instance.fire_event("Start", &mut host);
        assert_eq!(host.action_names(), vec!["PlayAnim"]);
        assert_eq!(output.switched_to, Some(running));
        assert_eq!(instance.current_state_name(), Some("Running"));
        assert!(output.diagnostics.is_empty());

        instance.fire_event("Start", &mut host);
        assert_eq!(host.action_names(), vec!["PlayAnim", "Run"]);
    }

    #[test]
    fn test_unknown_event_does_nothing() {
        let (script, idle, _) = idle_running();
        let mut instance = Instance::new(Arc::new(script));
        let output = instance.fire_event("Jump", &mut RecordingHost::new());
        assert!(output.is_empty());
        assert_eq!(instance.current_state(), Some(idle));
    }

    #[test]
    fn test_switch_is_deferred_until_pass_completes() {
        let mut script = Script::new("Deferred");
        let idle = script.add_state("Idle");
        let running = script.add_state("Running");
        let start = receiver(&mut script, idle, "Start");
        let to_running = switch(&mut script, idle, running);
        let still = action(&mut script, idle, "StillIdle");
        link(&mut script, start, "Out", to_running, "In");
        link(&mut script, start, "Out", still, "In");

        let mut instance = Instance::new(Arc::new(script));
        let mut host = RecordingHost::new();
        let output = instance.fire_event("Start", &mut host);

        assert_eq!(host.action_names(), vec!["StillIdle"]);
        assert!(matches!(
            output.events.last(),
            Some(ExecutionEvent::StateSwitched { from, to }) if *from == idle && *to == running
        ));
    }

    #[test]
    fn test_last_switch_request_wins() {
        let mut script = Script::new("Switches");
        let idle = script.add_state("Idle");
        let a = script.add_state("A");
        let b = script.add_state("B");
        let start = receiver(&mut script, idle, "Start");
        let to_a = switch(&mut script, idle, a);
        let to_b = switch(&mut script, idle, b);
        link(&mut script, start, "Out", to_a, "In");
        link(&mut script, start, "Out", to_b, "In");

        let mut instance = Instance::new(Arc::new(script));
        let output = instance.fire_event("Start", &mut RecordingHost::new());
        let requests = output
            .events
            .iter()
            .filter(|e| matches!(e, ExecutionEvent::SwitchRequested { .. }))
            .count();
        assert_eq!(requests, 2);
        assert_eq!(instance.current_state(), Some(b));
    }

    #[test]
    fn test_cycle_runs_each_node_once() {
        let mut script = Script::new("Loop");
        let idle = script.add_state("Idle");
        let start = receiver(&mut script, idle, "Tick");
        let first = action(&mut script, idle, "First");
        let second = action(&mut script, idle, "Second");
        link(&mut script, start, "Out", first, "In");
        link(&mut script, first, "Then", second, "In");
        link(&mut script, second, "Then", first, "In");

        let mut instance = Instance::new(Arc::new(script));
        let mut host = RecordingHost::new();
        let output = instance.fire_event("Tick", &mut host);
        assert_eq!(host.action_names(), vec!["First", "Second"]);
        assert_eq!(output.executed().count(), 3);
    }

    #[test]
    fn test_depth_first_order() {
        let mut script = Script::new("Order");
        let idle = script.add_state("Idle");
        let start = receiver(&mut script, idle, "Go");
        let a = action(&mut script, idle, "A");
        let a_child = action(&mut script, idle, "AChild");
        let b = action(&mut script, idle, "B");
        link(&mut script, start, "Out", a, "In");
        link(&mut script, start, "Out", b, "In");
        link(&mut script, a, "Then", a_child, "In");

        let mut instance = Instance::new(Arc::new(script));
        let mut host = RecordingHost::new();
        instance.fire_event("Go", &mut host);
        assert_eq!(host.action_names(), vec!["A", "AChild", "B"]);
    }

    #[test]
    fn test_failure_stops_only_its_branch() {
        let mut script = Script::new("Faulty");
        let idle = script.add_state("Idle");
        let start = receiver(&mut script, idle, "Go");
        let broken = action(&mut script, idle, "Broken");
        let after = action(&mut script, idle, "AfterBroken");
        let other = action(&mut script, idle, "Other");
        link(&mut script, start, "Out", broken, "In");
        link(&mut script, broken, "Then", after, "In");
        link(&mut script, start, "Out", other, "In");

        let buffer = DiagnosticsBuffer::new();
        let mut instance = Instance::new(Arc::new(script)).with_diagnostics(buffer.clone());
        let mut host = RecordingHost::new().fail_on("Broken");
        let output = instance.fire_event("Go", &mut host);

        assert_eq!(host.action_names(), vec!["Other"]);
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].node, broken);
        assert!(matches!(output.diagnostics[0].error, EffectError::Host(_)));

        let reported = buffer.take();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].event, "Go");
    }

    #[test]
    fn test_variable_write_and_pull() {
        let mut script = Script::new("Health");
        let idle = script.add_state("Idle");
        script.declare_variable(VariableDef::new("health", ValueType::Int).with_default(Value::Int(10)));

        let hit = receiver(&mut script, idle, "Hit");
        let set = script
            .add_node(
                idle,
                Node::new(NodeKind::Variable {
                    variable: "health".into(),
                }),
            )
            .unwrap();
        let three = script
            .add_node(idle, Node::new(NodeKind::Constant { value: Value::Int(3) }))
            .unwrap();
        let read = script
            .add_node(
                idle,
                Node::new(NodeKind::Variable {
                    variable: "health".into(),
                }),
            )
            .unwrap();
        let report = script
            .add_node(
                idle,
                Node::new(NodeKind::Action {
                    action: "Report".into(),
                })
                .with_port(Port::value_in("hp", ValueType::Int)),
            )
            .unwrap();

        link(&mut script, hit, "Out", set, "Set");
        link(&mut script, three, "Value", set, "New Value");
        link(&mut script, set, "Then", report, "In");
        link(&mut script, read, "Value", report, "hp");

        let script = Arc::new(script);
        let mut instance = Instance::new(Arc::clone(&script));
        let mut other = Instance::new(script);
        let mut host = RecordingHost::new();
        instance.fire_event("Hit", &mut host);

        assert_eq!(instance.variable("health"), Some(&Value::Int(3)));
        assert_eq!(other.variable("health"), Some(&Value::Int(10)));
        assert_eq!(host.performed[0].args[0].value, Value::Int(3));

        other.set_variable("health", Value::Float(7.9)).unwrap();
        assert_eq!(other.variable("health"), Some(&Value::Int(7)));
        assert!(other.set_variable("mana", Value::Int(1)).is_err());

        instance.reset();
        assert_eq!(instance.variable("health"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_condition_branches() {
        let mut script = Script::new("Check");
        let idle = script.add_state("Idle");
        script.declare_variable(VariableDef::new("health", ValueType::Int).with_default(Value::Int(10)));

        let go = receiver(&mut script, idle, "Go");
        let check = script
            .add_node(idle, Node::new(NodeKind::Condition { op: CompareOp::Greater }))
            .unwrap();
        let health = script
            .add_node(
                idle,
                Node::new(NodeKind::Variable {
                    variable: "health".into(),
                }),
            )
            .unwrap();
        let strong = action(&mut script, idle, "Strong");
        let weak = action(&mut script, idle, "Weak");

        link(&mut script, go, "Out", check, "In");
        link(&mut script, health, "Value", check, "A");
        link(&mut script, check, "True", strong, "In");
        link(&mut script, check, "False", weak, "In");
        let b = port(&script, check, "B");
        script
            .state_mut(idle)
            .unwrap()
            .set_port_default(check, b, Some(Value::Float(5.5)))
            .unwrap();

        let mut instance = Instance::new(Arc::new(script));
        let mut host = RecordingHost::new();
        instance.fire_event("Go", &mut host);
        instance.set_variable("health", Value::Int(2)).unwrap();
        instance.fire_event("Go", &mut host);
        assert_eq!(host.action_names(), vec!["Strong", "Weak"]);
    }

    #[test]
    fn test_missing_input_is_reported() {
        let mut script = Script::new("Missing");
        let idle = script.add_state("Idle");
        let go = receiver(&mut script, idle, "Go");
        let check = script
            .add_node(idle, Node::new(NodeKind::Condition { op: CompareOp::IsTrue }))
            .unwrap();
        link(&mut script, go, "Out", check, "In");

        let mut instance = Instance::new(Arc::new(script));
        let output = instance.fire_event("Go", &mut RecordingHost::new());
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].error, EffectError::MissingInput("A".into()));
    }

    #[test]
    fn test_action_result_feeds_downstream_input() {
        let mut script = Script::new("Dice");
        let idle = script.add_state("Idle");
        let go = receiver(&mut script, idle, "Go");
        let roll = script
            .add_node(
                idle,
                Node::new(NodeKind::Action {
                    action: "Roll".into(),
                })
                .with_port(Port::value_out("Result", ValueType::Int)),
            )
            .unwrap();
        let show = script
            .add_node(
                idle,
                Node::new(NodeKind::Action {
                    action: "Show".into(),
                })
                .with_port(Port::value_in("n", ValueType::Float)),
            )
            .unwrap();
        link(&mut script, go, "Out", roll, "In");
        link(&mut script, roll, "Then", show, "In");
        link(&mut script, roll, "Result", show, "n");

        let mut instance = Instance::new(Arc::new(script));
        let mut host = RecordingHost::new().returning("Roll", Value::Int(6));
        instance.fire_event("Go", &mut host);
        assert_eq!(host.performed[1].args[0].value, Value::Float(6.0));
    }

    #[test]
    fn test_dangling_connection_is_skipped() {
        let mut script = Script::new("Dangling");
        let idle = script.add_state("Idle");
        let go = receiver(&mut script, idle, "Go");
        let real = action(&mut script, idle, "Real");
        link(&mut script, go, "Out", real, "In");
        // Editing prunes dangling links, so restore it last
        let out = port(&script, go, "Out");
        script
            .state_mut(idle)
            .unwrap()
            .restore_connection(Connection::new(go, out, NodeId::new(), PortId::new()))
            .unwrap();

        let mut instance = Instance::new(Arc::new(script));
        let mut host = RecordingHost::new();
        let output = instance.fire_event("Go", &mut host);
        assert_eq!(host.action_names(), vec!["Real"]);
        assert!(output.diagnostics.is_empty());
    }
}
