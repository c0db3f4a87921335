// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::node::{Node, NodeKind};
use crate::port::PortId;
use crate::runtime::{EffectError, NodeEffect, PassContext};

/// Raises the node's event to the host, then continues.
pub struct EmitterEffect;

impl NodeEffect for EmitterEffect {
    fn execute(&self, ctx: &mut PassContext<'_>, node: &Node) -> Result<Vec<PortId>, EffectError> {
        if let NodeKind::EventEmitter { event } = node.kind() {
            ctx.emit(node.id(), event);
        }
        Ok(ctx.event_outputs(node))
    }
}
