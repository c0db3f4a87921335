// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::node::{Node, NodeKind};
use crate::port::PortId;
use crate::runtime::{EffectError, NodeEffect, PassContext};

/// Requests a switch of the instance's current state.
pub struct StateSwitchEffect;

impl NodeEffect for StateSwitchEffect {
    fn execute(&self, ctx: &mut PassContext<'_>, node: &Node) -> Result<Vec<PortId>, EffectError> {
        let NodeKind::StateSwitch { target } = node.kind() else {
            return Ok(ctx.event_outputs(node));
        };

        let target = target.ok_or(EffectError::MissingSwitchTarget)?;
        if ctx.script().state(target).is_none() {
            return Err(EffectError::UnknownState(target));
        }

        ctx.request_switch(node.id(), target);
        Ok(ctx.event_outputs(node))
    }
}
