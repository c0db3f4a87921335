// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::node::{CompareOp, Node, NodeKind};
use crate::port::{PortId, Value};
use crate::runtime::{EffectError, NodeEffect, PassContext};
use std::cmp::Ordering;

/// Evaluates `A <op> B` and follows the first (`True`) or second (`False`)
/// event output.
pub struct ConditionEffect;

impl NodeEffect for ConditionEffect {
    fn execute(&self, ctx: &mut PassContext<'_>, node: &Node) -> Result<Vec<PortId>, EffectError> {
        let NodeKind::Condition { op } = node.kind() else {
            return Ok(ctx.event_outputs(node));
        };

        let a = ctx.input_at(node, 0, "A")?;
        let result = if *op == CompareOp::IsTrue {
            a.is_truthy()
        } else {
            let b = ctx.input_at(node, 1, "B")?;
            compare(*op, &a, &b)?
        };

        let branch = if result {
            ctx.event_output(node, 0, "True")?
        } else {
            ctx.event_output(node, 1, "False")?
        };
        Ok(vec![branch])
    }
}

fn ordering(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Float(y)) => (*x as f32).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f32)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Compare two values. Equality works across any pair (mismatched types are
/// unequal); ordering needs numbers, booleans or strings on both sides.
pub fn compare(op: CompareOp, a: &Value, b: &Value) -> Result<bool, EffectError> {
    let order = ordering(a, b);
    let equal = a == b || order == Some(Ordering::Equal);

    let ordered = |check: fn(Ordering) -> bool| {
        order.map(check).ok_or(EffectError::Incomparable {
            left: a.value_type(),
            right: b.value_type(),
        })
    };

    match op {
        CompareOp::IsTrue => Ok(a.is_truthy()),
        CompareOp::Equal => Ok(equal),
        CompareOp::NotEqual => Ok(!equal),
        CompareOp::Less => ordered(Ordering::is_lt),
        CompareOp::LessEqual => ordered(Ordering::is_le),
        CompareOp::Greater => ordered(Ordering::is_gt),
        CompareOp::GreaterEqual => ordered(Ordering::is_ge),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_comparison_mixes_int_and_float() {
        assert!(compare(CompareOp::Equal, &Value::Int(2), &Value::Float(2.0)).unwrap());
        assert!(compare(CompareOp::Less, &Value::Int(1), &Value::Float(1.5)).unwrap());
        assert!(!compare(CompareOp::GreaterEqual, &Value::Float(0.5), &Value::Int(1)).unwrap());
    }

    #[test]
    fn test_mismatched_types() {
        let a = Value::String("3".into());
        let b = Value::Int(3);
        assert!(!compare(CompareOp::Equal, &a, &b).unwrap());
        assert!(compare(CompareOp::NotEqual, &a, &b).unwrap());
        assert!(matches!(
            compare(CompareOp::Less, &a, &b),
            Err(EffectError::Incomparable { .. })
        ));
    }
}
