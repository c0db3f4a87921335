// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::node::{Node, NodeKind};
use crate::port::PortId;
use crate::runtime::{EffectError, NodeEffect, PassContext};

/// Writes the pulled `New Value` input into instance storage.
///
/// Reads do not execute: the `Value` output is pulled by consumers.
pub struct VariableEffect;

impl NodeEffect for VariableEffect {
    fn execute(&self, ctx: &mut PassContext<'_>, node: &Node) -> Result<Vec<PortId>, EffectError> {
        let NodeKind::Variable { variable } = node.kind() else {
            return Ok(ctx.event_outputs(node));
        };

        let value = ctx.input_at(node, 0, "New Value")?;
        ctx.write_variable(variable, value)?;
        Ok(ctx.event_outputs(node))
    }
}
