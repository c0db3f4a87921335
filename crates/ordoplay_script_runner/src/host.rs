// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host that logs every effect instead of driving a game object.

use ordoplay_script_graph::runtime::{ActionArgument, HostError, ScriptHost};
use ordoplay_script_graph::Value;

/// Logs actions and emitted events at `info` level
#[derive(Debug, Default)]
pub struct LoggingHost {
    /// Actions performed so far
    pub actions: usize,
    /// Events emitted so far
    pub emitted: Vec<String>,
}

impl ScriptHost for LoggingHost {
    fn perform(&mut self, action: &str, args: &[ActionArgument]) -> Result<Option<Value>, HostError> {
        let args = args
            .iter()
            .map(|arg| format!("{}={}", arg.name, arg.value))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(action, %args, "action");
        self.actions += 1;
        Ok(None)
    }

    fn emit(&mut self, event: &str) {
        tracing::info!(event, "emitted");
        self.emitted.push(event.to_string());
    }
}
