//! Reversible file operations and the undo/redo stack that drives them.

mod delete;
mod engine;
mod rename;
mod replace;

pub use delete::DeleteCommand;
pub use engine::{HistoryEntry, UndoRedoEngine};
pub use rename::RenameCommand;
pub use replace::ReplaceCommand;

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::safety::SafetyManager;
use crate::store::{ImageStore, ResultList};

/// Everything a command may touch, passed in explicitly
pub struct CommandContext<'a> {
    pub images: &'a mut ImageStore,
    pub results: &'a mut ResultList,
    pub safety: &'a SafetyManager,
}

/// A unit of work that can be reversed until it is disposed
pub trait UndoableCommand: Debug {
    /// Perform the reversible step. On error the command leaves no trace.
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<()>;

    /// Reverse [`execute`](Self::execute)
    fn unexecute(&mut self, ctx: &mut CommandContext<'_>) -> Result<()>;

    /// Commit whatever cannot be undone any more, e.g. staged deletions.
    /// Only has an effect while the command is executed.
    fn dispose(&mut self, _safety: &SafetyManager) -> Result<()> {
        Ok(())
    }

    fn description(&self) -> String;
}

/// Where a command stands in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandState {
    Pending,
    Executed,
    Undone,
    Disposed,
}

/// File moves performed so far by one command step, undone on failure
#[derive(Debug, Default)]
pub(crate) struct Staging {
    done: Vec<(PathBuf, PathBuf)>,
}

impl Staging {
    pub(crate) fn move_file(&mut self, safety: &SafetyManager, from: &Path, to: &Path) -> Result<()> {
        safety.move_file(from, to)?;
        self.done.push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }

    /// Put every moved file back, newest first
    pub(crate) fn rollback(self, safety: &SafetyManager) {
        for (from, to) in self.done.into_iter().rev() {
            if let Err(e) = safety.move_file(&to, &from) {
                log::error!(
                    "Rollback failed, {} left at {}: {}",
                    from.display(),
                    to.display(),
                    e
                );
            }
        }
    }

    /// Run `step`; if it fails, undo the moves it made and pass the error on
    pub(crate) fn atomically<F>(safety: &SafetyManager, step: F) -> Result<()>
    where
        F: FnOnce(&mut Staging) -> Result<()>,
    {
        let mut staging = Staging::default();
        match step(&mut staging) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("Rolling back {} file moves after error: {}", staging.done.len(), e);
                staging.rollback(safety);
                Err(e)
            }
        }
    }
}

/// A file moved to its temp path by a delete-like command
#[derive(Debug, Clone)]
pub(crate) struct StagedFile {
    pub original: PathBuf,
    pub temp: PathBuf,
}

/// Commit every staged file, trying all of them and reporting the first failure
pub(crate) fn commit_staged(staged: &[StagedFile], safety: &SafetyManager) -> Result<()> {
    let mut first_error = None;
    for file in staged {
        if let Err(e) = safety.commit_delete(&file.temp) {
            log::error!("Failed to commit deletion of {}: {}", file.original.display(), e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
