use crate::foundation::core::PixelRect;
use crate::foundation::error::{LayerdocError, LayerdocResult};
use crate::history::command::Command;
use crate::layers::store::LayerStore;

/// Which directions the log can move in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum HistoryState {
    /// Nothing to undo or redo.
    Empty,
    /// Only undo is available.
    HasUndo,
    /// Only redo is available.
    HasRedo,
    /// Both directions are available.
    HasBoth,
}

/// One named, reversible edit.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    name: String,
    command: Command,
}

impl HistoryEntry {
    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recorded command.
    pub fn command(&self) -> &Command {
        &self.command
    }
}

/// Outcome of a successful undo or redo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Replayed {
    /// Name of the entry that ran.
    pub name: String,
    /// Damaged canvas rectangle, if any.
    pub damage: Option<PixelRect>,
}

/// Fixed-capacity ring of reversible commands.
///
/// Entries before the cursor can be undone, entries from the cursor on can be redone. When
/// the ring is full, appending overwrites the oldest entry, which is then gone for good.
/// Appending also drops every redoable entry.
#[derive(Clone, Debug)]
pub struct HistoryLog {
    slots: Vec<Option<HistoryEntry>>,
    cursor: usize,
    rest_undo: usize,
    rest_redo: usize,
}

impl HistoryLog {
    /// Empty log holding at most `capacity` entries.
    pub fn new(capacity: usize) -> LayerdocResult<Self> {
        if capacity == 0 {
            return Err(LayerdocError::validation("history capacity must be at least 1"));
        }
        Ok(Self {
            slots: (0..capacity).map(|_| None).collect(),
            cursor: 0,
            rest_undo: 0,
            rest_redo: 0,
        })
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Entries available to undo.
    pub fn rest_undo(&self) -> usize {
        self.rest_undo
    }

    /// Entries available to redo.
    pub fn rest_redo(&self) -> usize {
        self.rest_redo
    }

    /// Current state.
    pub fn state(&self) -> HistoryState {
        match (self.rest_undo > 0, self.rest_redo > 0) {
            (false, false) => HistoryState::Empty,
            (true, false) => HistoryState::HasUndo,
            (false, true) => HistoryState::HasRedo,
            (true, true) => HistoryState::HasBoth,
        }
    }

    /// Entry the next undo would revert.
    pub fn undo_entry(&self) -> Option<&HistoryEntry> {
        if self.rest_undo == 0 {
            return None;
        }
        self.slots[self.prev_index()].as_ref()
    }

    /// Entry the next redo would re-apply.
    pub fn redo_entry(&self) -> Option<&HistoryEntry> {
        if self.rest_redo == 0 {
            return None;
        }
        self.slots[self.cursor].as_ref()
    }

    /// Record an already applied command.
    pub fn append(&mut self, name: impl Into<String>, command: Command) {
        let name = name.into();
        if self.rest_undo == self.capacity()
            && let Some(old) = &self.slots[self.cursor]
        {
            tracing::debug!(evicted = %old.name, "history full, dropping oldest entry");
        }
        // Redoable entries past the cursor are unreachable from now on.
        for i in 0..self.rest_redo {
            let idx = (self.cursor + i) % self.capacity();
            self.slots[idx] = None;
        }
        self.slots[self.cursor] = Some(HistoryEntry { name, command });
        self.cursor = (self.cursor + 1) % self.capacity();
        self.rest_undo = (self.rest_undo + 1).min(self.capacity());
        self.rest_redo = 0;
    }

    /// Revert the newest undoable entry. `Ok(None)` when there is nothing to undo.
    ///
    /// A failing handler leaves the cursor where it was.
    #[tracing::instrument(skip_all, fields(rest_undo = self.rest_undo))]
    pub fn undo(&mut self, layers: &mut LayerStore) -> LayerdocResult<Option<Replayed>> {
        if self.rest_undo == 0 {
            return Ok(None);
        }
        let idx = self.prev_index();
        let entry = self.slots[idx]
            .as_mut()
            .ok_or_else(|| LayerdocError::validation("undo slot is empty"))?;
        let damage = entry.command.undo(layers)?;
        let name = entry.name.clone();
        self.cursor = idx;
        self.rest_undo -= 1;
        self.rest_redo += 1;
        Ok(Some(Replayed { name, damage }))
    }

    /// Re-apply the oldest redoable entry. `Ok(None)` when there is nothing to redo.
    #[tracing::instrument(skip_all, fields(rest_redo = self.rest_redo))]
    pub fn redo(&mut self, layers: &mut LayerStore) -> LayerdocResult<Option<Replayed>> {
        if self.rest_redo == 0 {
            return Ok(None);
        }
        let idx = self.cursor;
        let entry = self.slots[idx]
            .as_mut()
            .ok_or_else(|| LayerdocError::validation("redo slot is empty"))?;
        let damage = entry.command.redo(layers)?;
        let name = entry.name.clone();
        self.cursor = (idx + 1) % self.capacity();
        self.rest_undo += 1;
        self.rest_redo -= 1;
        Ok(Some(Replayed { name, damage }))
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.cursor = 0;
        self.rest_undo = 0;
        self.rest_redo = 0;
    }

    fn prev_index(&self) -> usize {
        (self.cursor + self.capacity() - 1) % self.capacity()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/history/log.rs"]
mod tests;
