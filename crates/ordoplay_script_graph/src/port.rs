// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node event and value slots.
//!
//! Event ports carry execution flow between nodes, value ports carry data.
//! Both share the same identity and indexing rules: a port belongs to one
//! node, and its index is its position in that node's port list.

use crate::connection::StructuralError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortId(pub Uuid);

impl PortId {
    /// Create a new random port ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PortId {
    fn default() -> Self {
        Self::new()
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// Data type that can flow through value ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// String value
    String,
    /// Any type (for generic nodes)
    Any,
}

impl ValueType {
    /// Get the color for this value type (for views)
    pub fn color(&self) -> [u8; 3] {
        match self {
            Self::Bool => [200, 80, 80],
            Self::Int => [80, 200, 200],
            Self::Float => [80, 200, 80],
            Self::Vector2 => [200, 200, 80],
            Self::Vector3 => [200, 150, 80],
            Self::String => [200, 180, 150],
            Self::Any => [150, 150, 150],
        }
    }

    /// Display name used in property tables and views
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Vector2 => "Vector2",
            Self::Vector3 => "Vector3",
            Self::String => "String",
            Self::Any => "Any",
        }
    }

    /// Check if this type can connect to another type
    pub fn can_connect_to(&self, other: &ValueType) -> bool {
        if matches!(self, Self::Any) || matches!(other, Self::Any) {
            return true;
        }

        if self == other {
            return true;
        }

        // Implicit conversions
        match (self, other) {
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => true,
            (Self::Float, Self::Vector2 | Self::Vector3) => true,
            (Self::Vector2, Self::Vector3) => true,
            _ => false,
        }
    }

    /// Zero value of this type, `None` for [`ValueType::Any`]
    pub fn zero(&self) -> Option<Value> {
        match self {
            Self::Bool => Some(Value::Bool(false)),
            Self::Int => Some(Value::Int(0)),
            Self::Float => Some(Value::Float(0.0)),
            Self::Vector2 => Some(Value::Vector2([0.0; 2])),
            Self::Vector3 => Some(Value::Vector3([0.0; 3])),
            Self::String => Some(Value::String(String::new())),
            Self::Any => None,
        }
    }
}

/// What travels through a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    /// Execution trigger
    Event,
    /// Typed value
    Value(ValueType),
}

impl PortKind {
    /// Whether this is an event port
    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event)
    }

    /// Value type carried by this port, if it is a value port
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Event => None,
            Self::Value(ty) => Some(*ty),
        }
    }

    /// Get the color for this port kind (for views)
    pub fn color(&self) -> [u8; 3] {
        match self {
            Self::Event => [200, 200, 200],
            Self::Value(ty) => ty.color(),
        }
    }
}

/// A value stored in variables, port defaults and node parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// String
    String(String),
}

impl Value {
    /// Get the value type for this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Vector2(_) => ValueType::Vector2,
            Self::Vector3(_) => ValueType::Vector3,
            Self::String(_) => ValueType::String,
        }
    }

    /// Convert to `target` following the implicit conversions allowed on
    /// connections. Returns `None` when no conversion exists.
    pub fn coerce_to(&self, target: ValueType) -> Option<Value> {
        if target == ValueType::Any || self.value_type() == target {
            return Some(self.clone());
        }

        match (self, target) {
            (Self::Int(i), ValueType::Float) => Some(Self::Float(*i as f32)),
            (Self::Float(f), ValueType::Int) => Some(Self::Int(*f as i32)),
            (Self::Float(f), ValueType::Vector2) => Some(Self::Vector2([*f; 2])),
            (Self::Float(f), ValueType::Vector3) => Some(Self::Vector3([*f; 3])),
            (Self::Vector2([x, y]), ValueType::Vector3) => Some(Self::Vector3([*x, *y, 0.0])),
            _ => None,
        }
    }

    /// Truthiness used by conditions: false, zero and empty values are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Vector2(v) => v.iter().any(|c| *c != 0.0),
            Self::Vector3(v) => v.iter().any(|c| *c != 0.0),
            Self::String(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Vector2([x, y]) => write!(f, "({x}, {y})"),
            Self::Vector3([x, y, z]) => write!(f, "({x}, {y}, {z})"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// A port on a node
#[derive(Debug, Clone)]
pub struct Port {
    pub(crate) id: PortId,
    pub(crate) name: String,
    pub(crate) index: usize,
    pub(crate) direction: PortDirection,
    pub(crate) kind: PortKind,
    pub(crate) default: Option<Value>,
    pub(crate) default_enabled: bool,
}

impl Port {
    /// Create a new port. The index is assigned when the port is added to a node.
    pub fn new(name: impl Into<String>, kind: PortKind, direction: PortDirection) -> Self {
        Self {
            id: PortId::new(),
            name: name.into(),
            index: 0,
            direction,
            kind,
            default: None,
            default_enabled: false,
        }
    }

    /// Create an event input port
    pub fn event_in(name: impl Into<String>) -> Self {
        Self::new(name, PortKind::Event, PortDirection::Input)
    }

    /// Create an event output port
    pub fn event_out(name: impl Into<String>) -> Self {
        Self::new(name, PortKind::Event, PortDirection::Output)
    }

    /// Create a value input port
    pub fn value_in(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, PortKind::Value(value_type), PortDirection::Input)
    }

    /// Create a value output port
    pub fn value_out(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, PortKind::Value(value_type), PortDirection::Output)
    }

    /// Set an enabled literal default, used when the input is not connected
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self.default_enabled = true;
        self
    }

    /// Unique port ID
    pub fn id(&self) -> PortId {
        self.id
    }

    /// Current port name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position within the owning node's port list
    pub fn index(&self) -> usize {
        self.index
    }

    /// Port direction
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Event or value kind
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// Whether this is an event port
    pub fn is_event(&self) -> bool {
        self.kind.is_event()
    }

    /// Literal default, if one is stored (enabled or not)
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether the literal default overrides an unconnected input
    pub fn default_enabled(&self) -> bool {
        self.default_enabled
    }

    /// The default that applies at runtime
    pub fn effective_default(&self) -> Option<&Value> {
        self.default.as_ref().filter(|_| self.default_enabled)
    }

    /// Check whether a connection from this port to `target` is valid
    pub fn check_connection(&self, target: &Port) -> Result<(), StructuralError> {
        if self.direction != PortDirection::Output || target.direction != PortDirection::Input {
            return Err(StructuralError::DirectionMismatch);
        }

        match (self.kind, target.kind) {
            (PortKind::Event, PortKind::Event) => Ok(()),
            (PortKind::Value(from), PortKind::Value(to)) => {
                if from.can_connect_to(&to) {
                    Ok(())
                } else {
                    Err(StructuralError::IncompatibleTypes { from, to })
                }
            }
            _ => Err(StructuralError::KindMismatch),
        }
    }

    /// Copy with a fresh identity
    pub(crate) fn duplicate(&self) -> Self {
        Self {
            id: PortId::new(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_compatibility() {
        assert!(ValueType::Int.can_connect_to(&ValueType::Float));
        assert!(ValueType::Float.can_connect_to(&ValueType::Vector3));
        assert!(ValueType::String.can_connect_to(&ValueType::Any));
        assert!(!ValueType::String.can_connect_to(&ValueType::Bool));
        assert!(!ValueType::Vector3.can_connect_to(&ValueType::Vector2));
    }

    #[test]
    fn test_coercion_follows_connection_rules() {
        assert_eq!(Value::Int(3).coerce_to(ValueType::Float), Some(Value::Float(3.0)));
        assert_eq!(
            Value::Vector2([1.0, 2.0]).coerce_to(ValueType::Vector3),
            Some(Value::Vector3([1.0, 2.0, 0.0]))
        );
        assert_eq!(Value::String("a".into()).coerce_to(ValueType::Int), None);
    }

    #[test]
    fn test_check_connection() {
        let event_out = Port::event_out("Then");
        let event_in = Port::event_in("In");
        let value_in = Port::value_in("Value", ValueType::Bool);
        let string_out = Port::value_out("Text", ValueType::String);

        assert!(event_out.check_connection(&event_in).is_ok());
        assert!(matches!(
            event_in.check_connection(&event_out),
            Err(StructuralError::DirectionMismatch)
        ));
        assert!(matches!(
            event_out.check_connection(&value_in),
            Err(StructuralError::KindMismatch)
        ));
        assert!(matches!(
            string_out.check_connection(&value_in),
            Err(StructuralError::IncompatibleTypes { .. })
        ));
    }

    #[test]
    fn test_port_displays_name() {
        let port = Port::event_out("Finished");
        assert_eq!(port.to_string(), "Finished");
    }
}
