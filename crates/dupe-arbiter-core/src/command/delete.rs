use std::path::PathBuf;

use super::{
    commit_staged, file_name, CommandContext, CommandState, StagedFile, Staging, UndoableCommand,
};
use crate::error::{Error, Result};
use crate::safety::SafetyManager;
use crate::store::ImageStore;
use crate::types::{DuplicatePairResult, ImageId};

#[derive(Debug, Clone, PartialEq, Eq)]
enum DeleteKind {
    Single(PathBuf),
    Multiple,
    Others { keep: PathBuf },
}

/// Stages one or more images for deletion and drops their results.
///
/// Files are renamed to their temp path on execute and sent away for good on
/// dispose. Staging is all-or-nothing: if one file cannot be moved, the ones
/// already moved are put back.
#[derive(Debug)]
pub struct DeleteCommand {
    kind: DeleteKind,
    targets: Vec<ImageId>,
    staged: Vec<StagedFile>,
    removed: Vec<DuplicatePairResult>,
    state: CommandState,
}

impl DeleteCommand {
    fn with_kind(kind: DeleteKind, targets: Vec<ImageId>) -> Self {
        Self {
            kind,
            targets,
            staged: Vec::new(),
            removed: Vec::new(),
            state: CommandState::Pending,
        }
    }

    pub fn single(image: ImageId, images: &ImageStore) -> Result<Self> {
        Ok(Self::with_kind(
            DeleteKind::Single(images.path(image)?),
            vec![image],
        ))
    }

    pub fn multiple(targets: Vec<ImageId>) -> Self {
        Self::with_kind(DeleteKind::Multiple, targets)
    }

    /// Delete every image in `delete`, keeping `keep`
    pub fn others(keep: ImageId, delete: Vec<ImageId>, images: &ImageStore) -> Result<Self> {
        Ok(Self::with_kind(
            DeleteKind::Others {
                keep: images.path(keep)?,
            },
            delete,
        ))
    }

    pub fn targets(&self) -> &[ImageId] {
        &self.targets
    }
}

impl UndoableCommand for DeleteCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<()> {
        let safety = ctx.safety;
        let originals = self
            .targets
            .iter()
            .map(|id| ctx.images.path(*id))
            .collect::<Result<Vec<_>>>()?;

        let mut staged = Vec::with_capacity(originals.len());
        Staging::atomically(safety, |staging| {
            for original in originals {
                let temp = safety.temp_path(&original);
                staging.move_file(safety, &original, &temp)?;
                staged.push(StagedFile { original, temp });
            }
            Ok(())
        })?;

        self.removed = ctx.results.remove_involving(&self.targets);
        self.staged = staged;
        self.state = CommandState::Executed;
        Ok(())
    }

    fn unexecute(&mut self, ctx: &mut CommandContext<'_>) -> Result<()> {
        if self.state != CommandState::Executed {
            return Err(Error::Unknown(format!(
                "Cannot undo '{}' in state {:?}",
                self.description(),
                self.state
            )));
        }
        let safety = ctx.safety;
        Staging::atomically(safety, |staging| {
            for file in self.staged.iter().rev() {
                staging.move_file(safety, &file.temp, &file.original)?;
            }
            Ok(())
        })?;

        ctx.results.restore(std::mem::take(&mut self.removed));
        self.staged.clear();
        self.state = CommandState::Undone;
        Ok(())
    }

    fn dispose(&mut self, safety: &SafetyManager) -> Result<()> {
        if self.state != CommandState::Executed {
            return Ok(());
        }
        self.state = CommandState::Disposed;
        commit_staged(&self.staged, safety)
    }

    fn description(&self) -> String {
        match &self.kind {
            DeleteKind::Single(path) => format!("Delete '{}'", file_name(path)),
            DeleteKind::Multiple => format!("Delete {} files", self.targets.len()),
            DeleteKind::Others { keep } => format!(
                "Delete {} duplicates of '{}'",
                self.targets.len(),
                file_name(keep)
            ),
        }
    }
}
