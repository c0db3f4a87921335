// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::node::{Node, NodeKind};
use crate::port::{PortDirection, PortId};
use crate::runtime::{ActionArgument, EffectError, NodeEffect, PassContext};

/// Performs a host action with every value input as a named argument.
pub struct ActionEffect;

impl NodeEffect for ActionEffect {
    fn execute(&self, ctx: &mut PassContext<'_>, node: &Node) -> Result<Vec<PortId>, EffectError> {
        let NodeKind::Action { action } = node.kind() else {
            return Ok(ctx.event_outputs(node));
        };

        // Pull every argument first; a missing one fails the node before the host sees it.
        let args = node
            .inputs()
            .filter(|p| !p.is_event())
            .map(|port| {
                Ok(ActionArgument {
                    name: port.name().to_string(),
                    value: ctx.read_input(port)?,
                })
            })
            .collect::<Result<Vec<_>, EffectError>>()?;

        if let Some(result) = ctx.perform(node.id(), action, &args)? {
            if let Some(port) = node.nth_port(PortDirection::Output, false, 0) {
                ctx.set_output(port.id(), result);
            }
        }

        Ok(ctx.event_outputs(node))
    }
}
