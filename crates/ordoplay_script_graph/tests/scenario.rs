// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end: build a character script, persist it, run two instances.

use ordoplay_script_graph::runtime::{ExecutionEvent, RecordingHost};
use ordoplay_script_graph::{
    ChangeKind, ChangeSubject, Instance, Node, NodeId, NodeKind, Port, Script, StateId, Value,
    ValueType, VariableDef,
};
use std::sync::Arc;

fn link(script: &mut Script, from: NodeId, out: &str, to: NodeId, input: &str) {
    let from_port = script.node(from).unwrap().port_named(out).unwrap().id();
    let to_port = script.node(to).unwrap().port_named(input).unwrap().id();
    script.connect(from, from_port, to, to_port).unwrap();
}

/// Idle: on Start play the run animation and switch to Running.
/// Running: on Start bump a counter and emit Footstep.
fn character() -> (Script, StateId, StateId) {
    let mut script = Script::new("Character");
    script.declare_variable(VariableDef::new("steps", ValueType::Int));
    let idle = script.add_state("Idle");
    let running = script.add_state("Running");

    let start = script
        .add_node(idle, Node::new(NodeKind::EventReceiver { event: "Start".into() }))
        .unwrap();
    let play = script
        .add_node(
            idle,
            Node::new(NodeKind::Action {
                action: "PlayAnim".into(),
            })
            .with_port(Port::value_in("Clip", ValueType::String).with_default(Value::String("run".into()))),
        )
        .unwrap();
    let switch = script
        .add_node(
            idle,
            Node::new(NodeKind::StateSwitch {
                target: Some(running),
            }),
        )
        .unwrap();
    link(&mut script, start, "Out", play, "In");
    link(&mut script, play, "Then", switch, "In");

    let start = script
        .add_node(running, Node::new(NodeKind::EventReceiver { event: "Start".into() }))
        .unwrap();
    let steps = script
        .add_node(running, Node::new(NodeKind::Variable { variable: "steps".into() }))
        .unwrap();
    let one = script
        .add_node(running, Node::new(NodeKind::Constant { value: Value::Int(1) }))
        .unwrap();
    let footstep = script
        .add_node(running, Node::new(NodeKind::EventEmitter { event: "Footstep".into() }))
        .unwrap();
    link(&mut script, start, "Out", steps, "Set");
    link(&mut script, one, "Value", steps, "New Value");
    link(&mut script, steps, "Then", footstep, "In");

    (script, idle, running)
}

#[test]
fn test_character_scenario() {
    let (script, idle, running) = character();
    let script = Arc::new(script);
    let mut first = Instance::new(Arc::clone(&script));
    let mut second = Instance::new(Arc::clone(&script));
    let mut host = RecordingHost::new();

    let output = first.fire_event("Start", &mut host);
    assert_eq!(host.action_names(), vec!["PlayAnim"]);
    assert_eq!(host.performed[0].args[0].value, Value::String("run".into()));
    assert_eq!(output.switched_to, Some(running));
    assert!(matches!(
        output.events.first(),
        Some(ExecutionEvent::EnterNode(_))
    ));

    // Instances do not share state
    assert_eq!(second.current_state(), Some(idle));

    first.fire_event("Start", &mut host);
    assert_eq!(first.variable("steps"), Some(&Value::Int(1)));
    assert_eq!(host.emitted, vec!["Footstep"]);
    assert_eq!(second.variable("steps"), Some(&Value::Int(0)));

    second.fire_event("Start", &mut host);
    assert_eq!(host.count("PlayAnim"), 2);
}

#[test]
fn test_persisted_script_runs_the_same() {
    let (script, _, running) = character();
    let loaded = Script::from_ron(&script.to_ron().unwrap()).unwrap();
    assert!(loaded.validate().is_empty());

    let mut instance = Instance::new(Arc::new(loaded));
    let mut host = RecordingHost::new();
    instance.fire_event("Start", &mut host);
    instance.fire_event("Start", &mut host);

    assert_eq!(instance.current_state(), Some(running));
    assert_eq!(host.action_names(), vec!["PlayAnim"]);
    assert_eq!(host.emitted, vec!["Footstep"]);
}

#[test]
fn test_editing_notifications() {
    let (mut script, idle, _) = character();
    let node = script.state(idle).unwrap().node_at(1).unwrap().id();

    let editable = script.node_mut(node).unwrap();
    editable.set_location([10.0, 10.0]);
    editable.set_location([10.0, 10.0]);
    let clip = editable.port_named("Clip").unwrap().id();
    assert!(!editable.rename_port(clip, "Clip").unwrap());
    assert!(editable.rename_port(clip, "Animation").unwrap());
    assert!(!script.rename_state(idle, "Idle").unwrap());

    let changes = script.drain_changes();
    let kinds: Vec<_> = changes.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ChangeKind::LocationChanged,
            ChangeKind::LocationChanged,
            ChangeKind::NameChanged
        ]
    );
    assert_eq!(changes[2].subject, ChangeSubject::Port { node, port: clip });
    assert!(script.drain_changes().is_empty());
}
