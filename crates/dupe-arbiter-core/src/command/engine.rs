use chrono::{DateTime, Local};
use std::collections::VecDeque;

use super::{CommandContext, UndoableCommand};
use crate::error::Result;
use crate::safety::SafetyManager;

/// A command together with the time it was last executed
#[derive(Debug)]
pub struct HistoryEntry {
    command: Box<dyn UndoableCommand>,
    executed_at: DateTime<Local>,
}

impl HistoryEntry {
    pub fn description(&self) -> String {
        self.command.description()
    }

    pub fn executed_at(&self) -> DateTime<Local> {
        self.executed_at
    }
}

/// Bounded undo stack plus redo stack.
///
/// A command lives on exactly one of the two stacks. When the undo stack
/// outgrows its capacity the oldest command is disposed, which commits its
/// pending deletions.
#[derive(Debug)]
pub struct UndoRedoEngine {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    capacity: usize,
}

impl UndoRedoEngine {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, disposing the oldest commands that no longer fit
    pub fn set_capacity(&mut self, capacity: usize, safety: &SafetyManager) {
        self.capacity = capacity;
        self.evict(safety);
    }

    /// Execute a command and make it undoable.
    ///
    /// The command is pushed only after it ran successfully. Any undone
    /// commands become unreachable and are dropped. The result reflects the
    /// new command only; a failure to commit an evicted command is logged and
    /// its staged files are left for [`SafetyManager::recover`].
    pub fn execute(
        &mut self,
        mut command: Box<dyn UndoableCommand>,
        ctx: &mut CommandContext<'_>,
    ) -> Result<()> {
        command.execute(ctx)?;
        log::info!("Executed: {}", command.description());

        self.redo.clear();
        self.undo.push_back(HistoryEntry {
            command,
            executed_at: Local::now(),
        });
        self.evict(ctx.safety);
        Ok(())
    }

    /// Undo the most recent command; `false` if there is nothing to undo
    pub fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<bool> {
        let Some(mut entry) = self.undo.pop_back() else {
            return Ok(false);
        };
        if let Err(e) = entry.command.unexecute(ctx) {
            self.undo.push_back(entry);
            return Err(e);
        }
        log::info!("Undone: {}", entry.description());
        self.redo.push(entry);
        Ok(true)
    }

    /// Redo the most recently undone command; `false` if there is none
    pub fn redo(&mut self, ctx: &mut CommandContext<'_>) -> Result<bool> {
        let Some(mut entry) = self.redo.pop() else {
            return Ok(false);
        };
        if let Err(e) = entry.command.execute(ctx) {
            self.redo.push(entry);
            return Err(e);
        }
        log::info!("Redone: {}", entry.description());
        entry.executed_at = Local::now();
        self.undo.push_back(entry);
        self.evict(ctx.safety);
        Ok(true)
    }

    /// Commit every undoable command and forget the whole history
    pub fn clear(&mut self, safety: &SafetyManager) -> Result<()> {
        self.redo.clear();
        let mut first_error = None;
        while let Some(mut entry) = self.undo.pop_front() {
            if let Err(e) = entry.command.dispose(safety) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn evict(&mut self, safety: &SafetyManager) {
        while self.undo.len() > self.capacity {
            if let Some(mut oldest) = self.undo.pop_front() {
                log::debug!("Undo history full, committing: {}", oldest.description());
                if let Err(e) = oldest.command.dispose(safety) {
                    log::error!("Failed to commit '{}': {}", oldest.description(), e);
                }
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Undoable commands, most recent first
    pub fn undo_history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.undo.iter().rev()
    }

    /// Redoable commands, most recently undone first
    pub fn redo_history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.redo.iter().rev()
    }
}
