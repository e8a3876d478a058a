//! # Undo Log
//!
//! Snapshot-based undo/redo for scene edits.
//!
//! ```text
//! record(name, before)   push (name, before) on undo, clear redo
//! undo(current)          pop undo -> snapshot, push (name, current) on redo
//! redo(current)          pop redo -> snapshot, push (name, current) on undo
//! ```
//!
//! Whole scenes are stored rather than deltas; scenes are small values and
//! history lives only as long as the editing session.

use std::collections::VecDeque;

use crate::Scene;

/// A named snapshot in the log.
#[derive(Debug, Clone, PartialEq)]
struct Entry {
    action: String,
    scene: Scene,
}

/// Undo and redo stacks of scene snapshots.
#[derive(Debug, Clone, Default)]
pub struct UndoLog {
    undo: VecDeque<Entry>,
    redo: Vec<Entry>,
    /// Maximum undo depth (oldest entries dropped when exceeded).
    limit: Option<usize>,
}

impl UndoLog {
    /// Create an unbounded undo log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log keeping at most `limit` undo entries.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Record the scene as it was before an action ran.
    ///
    /// Recording a new action discards anything that could have been redone.
    pub fn record(&mut self, action: impl Into<String>, before: Scene) {
        self.redo.clear();
        self.push_undo(Entry {
            action: action.into(),
            scene: before,
        });
    }

    /// Step back one action.
    ///
    /// `current` becomes redoable. Returns the action name and the scene to
    /// restore, or `None` when there is nothing to undo.
    pub fn undo(&mut self, current: Scene) -> Option<(String, Scene)> {
        let entry = self.undo.pop_back()?;
        self.redo.push(Entry {
            action: entry.action.clone(),
            scene: current,
        });
        Some((entry.action, entry.scene))
    }

    /// Replay the most recently undone action.
    pub fn redo(&mut self, current: Scene) -> Option<(String, Scene)> {
        let entry = self.redo.pop()?;
        self.push_undo(Entry {
            action: entry.action.clone(),
            scene: current,
        });
        Some((entry.action, entry.scene))
    }

    fn push_undo(&mut self, entry: Entry) {
        if let Some(limit) = self.limit {
            if limit == 0 {
                return;
            }
            while self.undo.len() >= limit {
                self.undo.pop_front();
            }
        }
        self.undo.push_back(entry);
    }

    /// Check if there is anything to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Check if there is anything to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Name of the action the next undo would revert.
    #[must_use]
    pub fn undo_action_name(&self) -> Option<&str> {
        self.undo.back().map(|e| e.action.as_str())
    }

    /// Name of the action the next redo would replay.
    #[must_use]
    pub fn redo_action_name(&self) -> Option<&str> {
        self.redo.last().map(|e| e.action.as_str())
    }
}
