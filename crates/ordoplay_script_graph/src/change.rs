// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change notifications for presentation collaborators.
//!
//! Mutable editor metadata (locations, comments, names) records a [`Change`]
//! when assigned. Views poll the queue with `drain_changes` instead of
//! subscribing to callbacks, so the model never holds presentation objects.

use crate::node::NodeId;
use crate::port::PortId;
use crate::state::StateId;

/// What changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A node location was assigned
    LocationChanged,
    /// A node comment was assigned
    CommentChanged,
    /// A port or state was renamed
    NameChanged,
}

/// The entity a change refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeSubject {
    /// A node
    Node(NodeId),
    /// A port on a node
    Port {
        /// Owning node
        node: NodeId,
        /// The port
        port: PortId,
    },
    /// A state
    State(StateId),
}

/// A single change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Change {
    /// Changed entity
    pub subject: ChangeSubject,
    /// Kind of change
    pub kind: ChangeKind,
}

impl Change {
    /// Create a new change notification
    pub fn new(subject: ChangeSubject, kind: ChangeKind) -> Self {
        Self { subject, kind }
    }
}

/// Pending notifications, in the order they were raised
#[derive(Debug, Clone, Default)]
pub struct ChangeQueue {
    pending: Vec<Change>,
}

impl ChangeQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change
    pub fn push(&mut self, change: Change) {
        self.pending.push(change);
    }

    /// Take every pending change
    pub fn drain(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.pending)
    }

    /// Number of pending changes
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
