// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::node::Node;
use crate::port::PortId;
use crate::runtime::{EffectError, NodeEffect, PassContext};

/// Default behavior: follow every event output.
pub struct PassthroughEffect;

impl NodeEffect for PassthroughEffect {
    fn execute(&self, ctx: &mut PassContext<'_>, node: &Node) -> Result<Vec<PortId>, EffectError> {
        Ok(ctx.event_outputs(node))
    }
}
