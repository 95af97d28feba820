//! Undo/redo for in-place edits
//!
//! In-place reconciliation overwrites an image record, so the caller records
//! the pre-mutation snapshot here first. Snapshots are whole `Image` records
//! keyed by their id; restoring one swaps it with the live record so the
//! displaced state moves to the opposite stack.

use std::collections::VecDeque;

use crate::session::tracker::ImageSession;
use crate::types::{Image, ImageId};

/// Default number of snapshots kept per stack
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// Bounded undo/redo stacks of image snapshots
#[derive(Debug, Clone)]
pub struct UndoHistory {
    undo_stack: VecDeque<Image>,
    redo_stack: Vec<Image>,
    max_depth: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl UndoHistory {
    /// Create a history keeping at most `max_depth` undo snapshots
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Record the state of an image before it is mutated.
    ///
    /// This truncates any redo history.
    pub fn push(&mut self, before: Image) {
        self.redo_stack.clear();
        self.undo_stack.push_back(before);
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    /// Restore the most recent snapshot whose image still exists.
    ///
    /// Snapshots of images removed from the session are discarded. Returns
    /// the id of the restored image.
    pub fn undo(&mut self, session: &mut ImageSession) -> Option<ImageId> {
        while let Some(snapshot) = self.undo_stack.pop_back() {
            if let Some(current) = swap_into(session, snapshot) {
                let id = current.id.clone();
                self.redo_stack.push(current);
                tracing::debug!("Undo restored image {}", id);
                return Some(id);
            }
        }
        None
    }

    /// Re-apply the most recently undone edit
    pub fn redo(&mut self, session: &mut ImageSession) -> Option<ImageId> {
        while let Some(snapshot) = self.redo_stack.pop() {
            if let Some(current) = swap_into(session, snapshot) {
                let id = current.id.clone();
                self.undo_stack.push_back(current);
                tracing::debug!("Redo restored image {}", id);
                return Some(id);
            }
        }
        None
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Clear all snapshots
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// Put `snapshot` into the session and hand back the record it displaced.
fn swap_into(session: &mut ImageSession, snapshot: Image) -> Option<Image> {
    let current = session.get(&snapshot.id)?.clone();
    session.restore(snapshot);
    Some(current)
}
