// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node palette: named templates the editor offers for new nodes.

use crate::node::{CompareOp, Node, NodeCategory, NodeKind};
use crate::port::{Port, Value, ValueType};
use indexmap::IndexMap;

/// A palette entry
#[derive(Debug, Clone)]
pub struct NodeTemplate {
    /// Unique template identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Palette section
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Kind and parameters of created nodes
    pub kind: NodeKind,
    /// Ports added after the kind's fixed layout
    pub extra_ports: Vec<Port>,
}

impl NodeTemplate {
    /// Template for a node kind without extra ports; the category follows the kind
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: kind.category(),
            description: String::new(),
            kind,
            extra_ports: Vec::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an extra port
    pub fn with_port(mut self, port: Port) -> Self {
        self.extra_ports.push(port);
        self
    }

    /// Create a detached node; every call yields fresh node and port identities
    pub fn instantiate(&self) -> Node {
        self.extra_ports
            .iter()
            .fold(Node::new(self.kind.clone()), |node, port| node.with_port(port.duplicate()))
    }
}

/// Registry of available node templates
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    templates: IndexMap<String, NodeTemplate>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing one with the same ID
    pub fn register(&mut self, template: NodeTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    /// Get a template by ID
    pub fn get(&self, id: &str) -> Option<&NodeTemplate> {
        self.templates.get(id)
    }

    /// All templates in registration order
    pub fn types(&self) -> impl Iterator<Item = &NodeTemplate> {
        self.templates.values()
    }

    /// Templates in one palette section
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeTemplate> {
        self.templates.values().filter(move |t| t.category == category)
    }

    /// Create a detached node from a template ID
    pub fn create_node(&self, type_id: &str) -> Option<Node> {
        self.get(type_id).map(NodeTemplate::instantiate)
    }
}

/// Palette for gameplay scripts
pub fn create_gameplay_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    // Events
    registry.register(
        NodeTemplate::new(
            "event_begin_play",
            "Event Begin Play",
            NodeKind::EventReceiver {
                event: "BeginPlay".into(),
            },
        )
        .with_description("Triggered when gameplay starts"),
    );
    registry.register(
        NodeTemplate::new(
            "event_tick",
            "Event Tick",
            NodeKind::EventReceiver {
                event: "Tick".into(),
            },
        )
        .with_description("Triggered every frame"),
    );
    registry.register(
        NodeTemplate::new(
            "emit_event",
            "Emit Event",
            NodeKind::EventEmitter {
                event: "Custom".into(),
            },
        )
        .with_description("Raise an event to the game object"),
    );

    // Logic
    registry.register(
        NodeTemplate::new("branch", "Branch", NodeKind::Condition { op: CompareOp::IsTrue })
            .with_description("If/else branching"),
    );
    registry.register(
        NodeTemplate::new("compare", "Compare", NodeKind::Condition { op: CompareOp::Equal })
            .with_description("Compare two values"),
    );

    // Actions
    registry.register(
        NodeTemplate::new(
            "print_string",
            "Print String",
            NodeKind::Action {
                action: "PrintString".into(),
            },
        )
        .with_description("Print a string to the console")
        .with_port(Port::value_in("String", ValueType::String).with_default(Value::String("Hello".into()))),
    );
    registry.register(
        NodeTemplate::new(
            "play_animation",
            "Play Animation",
            NodeKind::Action {
                action: "PlayAnim".into(),
            },
        )
        .with_description("Play an animation clip")
        .with_port(Port::value_in("Clip", ValueType::String))
        .with_port(Port::value_in("Speed", ValueType::Float).with_default(Value::Float(1.0))),
    );

    // Variables
    registry.register(
        NodeTemplate::new(
            "variable",
            "Variable",
            NodeKind::Variable {
                variable: String::new(),
            },
        )
        .with_description("Read or assign a script variable"),
    );
    registry.register(
        NodeTemplate::new(
            "constant_float",
            "Float",
            NodeKind::Constant {
                value: Value::Float(0.0),
            },
        )
        .with_description("Constant float"),
    );
    registry.register(
        NodeTemplate::new(
            "constant_bool",
            "Bool",
            NodeKind::Constant {
                value: Value::Bool(false),
            },
        )
        .with_description("Constant boolean"),
    );

    // Flow
    registry.register(
        NodeTemplate::new("switch_state", "Switch State", NodeKind::StateSwitch { target: None })
            .with_description("Change the current state once the event has run"),
    );

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_node() {
        let registry = create_gameplay_registry();
        let a = registry.create_node("play_animation").unwrap();
        let b = registry.create_node("play_animation").unwrap();

        assert_ne!(a.id(), b.id());
        assert_ne!(a.port_named("Speed").unwrap().id(), b.port_named("Speed").unwrap().id());
        assert_eq!(a.port_named("Speed").unwrap().index(), 3);
        assert_eq!(a.fixed_port_count(), 2);
        assert!(!a.is_attached());
        assert!(registry.create_node("missing").is_none());
    }

    #[test]
    fn test_categories() {
        let registry = create_gameplay_registry();
        let events: Vec<_> = registry
            .types_in_category(NodeCategory::Event)
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(events, vec!["event_begin_play", "event_tick", "emit_event"]);
        assert_eq!(registry.get("branch").unwrap().category, NodeCategory::Logic);
        assert!(registry.types().all(|t| !t.description.is_empty()));
    }
}
