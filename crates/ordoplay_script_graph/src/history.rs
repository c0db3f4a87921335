// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history for script editing.
//!
//! Each committed edit stores compact `bincode` snapshots of the script
//! document before and after the edit. Undo and redo decode the stored
//! snapshot back into a [`Script`], so identities survive the round trip.

use crate::document::{DocumentError, ScriptDocument};
use crate::script::Script;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Maximum undo history depth
const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// The stored document no longer decodes into a script
    #[error("Snapshot error: {0}")]
    Document(#[from] DocumentError),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Unique edit ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditId(u64);

impl EditId {
    /// Get the raw ID value
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Serialized script state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// `bincode` encoded [`ScriptDocument`]
    pub data: Vec<u8>,
    /// Timestamp when the snapshot was taken
    pub timestamp: u64,
}

impl Snapshot {
    /// Capture a script
    pub fn capture(script: &Script) -> Result<Self> {
        Ok(Self {
            data: bincode::serialize(&script.to_document())?,
            timestamp: now(),
        })
    }

    /// Rebuild the captured script
    pub fn restore(&self) -> Result<Script> {
        let document: ScriptDocument = bincode::deserialize(&self.data)?;
        Ok(Script::from_document(document)?)
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A committed edit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edit {
    /// Unique edit ID
    pub id: EditId,
    /// Human-readable description
    pub description: String,
    /// State before the edit (for undo)
    pub before: Snapshot,
    /// State after the edit (for redo)
    pub after: Snapshot,
}

impl Edit {
    /// Memory used by both snapshots
    pub fn memory_size(&self) -> usize {
        self.before.size() + self.after.size()
    }
}

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Edits in the undo stack
    pub undo_count: usize,
    /// Edits in the redo stack
    pub redo_count: usize,
    /// Total memory used by history (bytes)
    pub memory_used: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<Edit>,
    redo_stack: VecDeque<Edit>,
    next_id: u64,
    max_depth: usize,
    memory_used: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            next_id: 1,
            max_depth,
            memory_used: 0,
        }
    }

    /// Record an edit from the script before and after it. Clears the redo
    /// stack.
    pub fn commit(&mut self, description: impl Into<String>, before: &Script, after: &Script) -> Result<EditId> {
        let id = EditId(self.next_id);
        self.next_id += 1;

        let edit = Edit {
            id,
            description: description.into(),
            before: Snapshot::capture(before)?,
            after: Snapshot::capture(after)?,
        };
        tracing::debug!(edit = id.value(), description = %edit.description, "edit committed");

        self.redo_stack.clear();
        self.memory_used += edit.memory_size();
        self.undo_stack.push_back(edit);

        while self.undo_stack.len() > self.max_depth {
            if let Some(old) = self.undo_stack.pop_front() {
                self.memory_used = self.memory_used.saturating_sub(old.memory_size());
            }
        }

        Ok(id)
    }

    /// Run `edit` on `script` and commit it if it succeeds. A failed edit
    /// leaves no history entry.
    pub fn record<T, E>(
        &mut self,
        description: impl Into<String>,
        script: &mut Script,
        edit: impl FnOnce(&mut Script) -> std::result::Result<T, E>,
    ) -> Result<std::result::Result<T, E>> {
        let before = script.clone();
        let outcome = edit(script);
        if outcome.is_ok() {
            self.commit(description, &before, script)?;
        }
        Ok(outcome)
    }

    /// Undo the last edit, returning the script as it was before it. The
    /// edit stays on the undo stack when its snapshot cannot be restored.
    pub fn undo(&mut self) -> Result<Script> {
        let script = self
            .undo_stack
            .back()
            .ok_or(HistoryError::NothingToUndo)?
            .before
            .restore()?;

        if let Some(edit) = self.undo_stack.pop_back() {
            self.memory_used = self.memory_used.saturating_sub(edit.memory_size());
            self.redo_stack.push_back(edit);
        }
        Ok(script)
    }

    /// Redo the last undone edit, returning the script as it was after it.
    /// The edit stays on the redo stack when its snapshot cannot be restored.
    pub fn redo(&mut self) -> Result<Script> {
        let script = self
            .redo_stack
            .back()
            .ok_or(HistoryError::NothingToRedo)?
            .after
            .restore()?;

        if let Some(edit) = self.redo_stack.pop_back() {
            self.memory_used += edit.memory_size();
            self.undo_stack.push_back(edit);
        }
        Ok(script)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.memory_used = 0;
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            memory_used: self.memory_used,
            max_depth: self.max_depth,
        }
    }

    /// Get description of next undo edit
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description.as_str())
    }

    /// Get description of next redo edit
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeKind};
    use crate::state::EditError;

    fn action(name: &str) -> Node {
        Node::new(NodeKind::Action {
            action: name.to_string(),
        })
    }

    #[test]
    fn test_undo_redo() {
        let mut history = History::new();
        let mut script = Script::new("Door");
        let idle = script.add_state("Idle");

        let node = history
            .record("Add node", &mut script, |s| s.add_node(idle, action("Open")))
            .unwrap()
            .unwrap();
        assert_eq!(history.undo_description(), Some("Add node"));

        let undone = history.undo().unwrap();
        assert!(undone.node(node).is_none());
        assert_eq!(undone.state(idle).unwrap().name(), "Idle");
        assert!(history.can_redo());

        let redone = history.redo().unwrap();
        assert_eq!(redone.node(node).unwrap().state(), Some(idle));
        assert!(matches!(history.redo(), Err(HistoryError::NothingToRedo)));
    }

    #[test]
    fn test_failed_edit_is_not_recorded() {
        let mut history = History::new();
        let mut script = Script::new("Door");
        let missing = crate::state::StateId::new();

        let outcome = history
            .record("Add node", &mut script, |s| s.add_node(missing, action("Open")))
            .unwrap();
        assert_eq!(outcome, Err(EditError::StateNotFound(missing)));
        assert!(!history.can_undo());
        assert!(matches!(history.undo(), Err(HistoryError::NothingToUndo)));
    }

    #[test]
    fn test_corrupt_snapshot_leaves_history_intact() {
        let mut history = History::new();
        let mut script = Script::new("Door");
        let idle = script.add_state("Idle");
        history
            .record("Add node", &mut script, |s| s.add_node(idle, action("Open")))
            .unwrap()
            .unwrap();
        let stats = history.stats();

        let good = history.undo_stack[0].before.data.clone();
        history.undo_stack[0].before.data.truncate(3);
        assert!(matches!(history.undo(), Err(HistoryError::Serialization(_))));
        assert_eq!(history.stats(), stats);
        assert!(!history.can_redo());

        history.undo_stack[0].before.data = good;
        history.undo().unwrap();
        let good = history.redo_stack[0].after.data.clone();
        history.redo_stack[0].after.data.clear();
        assert!(history.redo().is_err());
        assert_eq!(history.stats().redo_count, 1);
        assert!(!history.can_undo());

        history.redo_stack[0].after.data = good;
        history.redo().unwrap();
        assert_eq!(history.stats(), stats);
    }

    #[test]
    fn test_depth_limit_and_redo_cleared() {
        let mut history = History::with_max_depth(2);
        let mut script = Script::new("Door");
        for name in ["A", "B", "C"] {
            history
                .record(name, &mut script, |s| Ok::<_, EditError>(s.add_state(name)))
                .unwrap()
                .unwrap();
        }
        let stats = history.stats();
        assert_eq!(stats.undo_count, 2);
        assert!(stats.memory_used > 0);

        history.undo().unwrap();
        assert!(history.can_redo());
        let before = script.clone();
        script.add_state("D");
        history.commit("D", &before, &script).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.undo_description(), Some("D"));
    }
}
