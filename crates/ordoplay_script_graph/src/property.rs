// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property table for inspector collaborators.
//!
//! A node exposes its kind parameters (event name, action name, operator,
//! variable name, constant value) followed by one optional row per value
//! input holding the input's literal default.

use crate::change::{ChangeKind, ChangeSubject};
use crate::node::{CompareOp, Node, NodeKind};
use crate::port::{Port, Value, ValueType};
use crate::state::StateId;

/// Name of the operator row on condition nodes
const OPERATOR: &str = "Operator";

const OPERATORS: [CompareOp; 7] = [
    CompareOp::IsTrue,
    CompareOp::Equal,
    CompareOp::NotEqual,
    CompareOp::Less,
    CompareOp::LessEqual,
    CompareOp::Greater,
    CompareOp::GreaterEqual,
];

/// Error when editing properties
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    /// No row with this name
    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    /// The value has a different type than the row
    #[error("Property {name} expects {expected:?}, got {found:?}")]
    TypeMismatch {
        /// Row name
        name: String,
        /// Row type
        expected: ValueType,
        /// Given type
        found: ValueType,
    },

    /// Only input defaults can be switched off
    #[error("Property {0} cannot be disabled")]
    NotOptional(String),

    /// Enabling a default that has no value and no zero value for its type
    #[error("Property {0} has no value to enable")]
    NoValue(String),

    /// Unrecognised comparison symbol
    #[error("Unknown operator: {0}")]
    InvalidOperator(String),

    /// Not a state switch node
    #[error("Node has no switch target")]
    NotASwitch,
}

/// One editable row
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRow {
    /// Row name: the parameter or input port name
    pub name: String,
    /// Current value, if any
    pub value: Option<Value>,
    /// Type accepted by [`Node::set_property`]
    pub value_type: ValueType,
    /// Whether the value is in use
    pub enabled: bool,
    /// Whether the row can be disabled
    pub optional: bool,
}

impl PropertyRow {
    fn parameter(name: &str, value: Value) -> Self {
        Self {
            name: name.to_string(),
            value_type: value.value_type(),
            value: Some(value),
            enabled: true,
            optional: false,
        }
    }
}

fn parameter(kind: &NodeKind) -> Option<PropertyRow> {
    let row = match kind {
        NodeKind::EventReceiver { event } | NodeKind::EventEmitter { event } => {
            PropertyRow::parameter("Event", Value::String(event.clone()))
        }
        NodeKind::Action { action } => PropertyRow::parameter("Action", Value::String(action.clone())),
        NodeKind::Condition { op } => PropertyRow::parameter(OPERATOR, Value::String(op.symbol().to_string())),
        NodeKind::Variable { variable } => PropertyRow::parameter("Variable", Value::String(variable.clone())),
        NodeKind::Constant { value } => PropertyRow::parameter("Value", value.clone()),
        NodeKind::StateSwitch { .. } => return None,
    };
    Some(row)
}

fn expect_type(name: &str, expected: ValueType, value: &Value) -> Result<(), PropertyError> {
    if expected == ValueType::Any || value.value_type() == expected {
        Ok(())
    } else {
        Err(PropertyError::TypeMismatch {
            name: name.to_string(),
            expected,
            found: value.value_type(),
        })
    }
}

impl Node {
    /// Rows for the property collaborator, kind parameters first
    pub fn properties(&self) -> Vec<PropertyRow> {
        let mut rows: Vec<PropertyRow> = parameter(self.kind()).into_iter().collect();
        rows.extend(
            self.inputs()
                .filter_map(|port| port.kind().value_type().map(|ty| (port, ty)))
                .map(|(port, value_type)| PropertyRow {
                    name: port.name().to_string(),
                    value: port.default_value().cloned(),
                    value_type,
                    enabled: port.default_enabled(),
                    optional: true,
                }),
        );
        rows
    }

    /// Assign a row's value. The type must match the row; an input's enabled
    /// flag is left as it is.
    pub fn set_property(&mut self, name: &str, value: Value) -> Result<(), PropertyError> {
        if let Some(row) = parameter(self.kind()).filter(|row| row.name == name) {
            expect_type(name, row.value_type, &value)?;
            return self.set_parameter(value);
        }

        let port = self
            .input_named_mut(name)
            .ok_or_else(|| PropertyError::UnknownProperty(name.to_string()))?;
        if let Some(expected) = port.kind.value_type() {
            expect_type(name, expected, &value)?;
        }
        port.default = Some(value);
        Ok(())
    }

    /// Switch an optional row on or off. Enabling an input without a stored
    /// default starts it at its type's zero value.
    pub fn set_property_enabled(&mut self, name: &str, enabled: bool) -> Result<(), PropertyError> {
        if parameter(self.kind()).is_some_and(|row| row.name == name) {
            return Err(PropertyError::NotOptional(name.to_string()));
        }

        let port = self
            .input_named_mut(name)
            .ok_or_else(|| PropertyError::UnknownProperty(name.to_string()))?;
        if enabled && port.default.is_none() {
            let zero = port.kind.value_type().and_then(|ty| ty.zero());
            port.default = Some(zero.ok_or_else(|| PropertyError::NoValue(name.to_string()))?);
        }
        port.default_enabled = enabled;
        Ok(())
    }

    /// Retarget a state switch node
    pub fn set_switch_target(&mut self, state: Option<StateId>) -> Result<(), PropertyError> {
        match self.kind_mut() {
            NodeKind::StateSwitch { target } => {
                *target = state;
                Ok(())
            }
            _ => Err(PropertyError::NotASwitch),
        }
    }

    fn input_named_mut(&mut self, name: &str) -> Option<&mut Port> {
        let id = self
            .inputs()
            .find(|p| !p.is_event() && p.name() == name)?
            .id();
        self.port_mut(id)
    }

    /// Event renames notify dependent labels, other parameters do not
    fn set_parameter(&mut self, value: Value) -> Result<(), PropertyError> {
        let mut renamed = false;
        match (self.kind_mut(), value) {
            (NodeKind::EventReceiver { event } | NodeKind::EventEmitter { event }, Value::String(s)) => {
                renamed = *event != s;
                *event = s;
            }
            (NodeKind::Action { action }, Value::String(s)) => *action = s,
            (NodeKind::Variable { variable }, Value::String(s)) => *variable = s,
            (NodeKind::Condition { op }, Value::String(s)) => {
                *op = OPERATORS
                    .into_iter()
                    .find(|candidate| candidate.symbol() == s)
                    .ok_or(PropertyError::InvalidOperator(s))?;
            }
            (NodeKind::Constant { value }, new) => *value = new,
            (_, other) => return Err(PropertyError::UnknownProperty(other.to_string())),
        }
        if renamed {
            self.notify(ChangeSubject::Node(self.id()), ChangeKind::NameChanged);
        }
        Ok(())
    }
}
