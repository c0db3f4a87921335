// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reporting of per-node effect failures.

use crate::node::NodeId;
use crate::runtime::EffectError;
use crate::state::StateId;
use parking_lot::Mutex;
use std::sync::Arc;

/// A node effect that failed during a propagation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Event that started the pass
    pub event: String,
    /// State the pass ran in
    pub state: StateId,
    /// Failing node
    pub node: NodeId,
    /// What went wrong
    pub error: EffectError,
}

/// Receives node failures; propagation continues after reporting
pub trait DiagnosticsSink: Send {
    /// Report a failure
    fn report(&mut self, diagnostic: &Diagnostic);
}

/// Sink that logs failures through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn report(&mut self, diagnostic: &Diagnostic) {
        tracing::warn!(
            event = %diagnostic.event,
            state = ?diagnostic.state,
            node = ?diagnostic.node,
            "node effect failed: {}",
            diagnostic.error
        );
    }
}

/// Cloneable sink collecting failures into a shared buffer
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsBuffer {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticsBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every collected diagnostic
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Number of collected diagnostics
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing was collected
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl DiagnosticsSink for DiagnosticsBuffer {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.entries.lock().push(diagnostic.clone());
    }
}
