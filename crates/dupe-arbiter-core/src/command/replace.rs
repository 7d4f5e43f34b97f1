use std::path::PathBuf;

use super::{
    commit_staged, file_name, CommandContext, CommandState, StagedFile, Staging, UndoableCommand,
};
use crate::error::{Error, Result};
use crate::safety::SafetyManager;
use crate::store::ImageStore;
use crate::types::{DuplicatePairResult, ImageId};

/// Puts `source` in place of `target` and stages `target` plus `others` for deletion.
///
/// Used when the best-quality image and the image with the preferred file
/// name differ: the better file ends up under the preferred name.
#[derive(Debug)]
pub struct ReplaceCommand {
    source: ImageId,
    target: ImageId,
    others: Vec<ImageId>,
    source_path: PathBuf,
    target_path: PathBuf,
    staged: Vec<StagedFile>,
    removed: Vec<DuplicatePairResult>,
    state: CommandState,
}

impl ReplaceCommand {
    pub fn new(
        source: ImageId,
        target: ImageId,
        others: Vec<ImageId>,
        images: &ImageStore,
    ) -> Result<Self> {
        Ok(Self {
            source,
            target,
            others,
            source_path: images.path(source)?,
            target_path: images.path(target)?,
            staged: Vec::new(),
            removed: Vec::new(),
            state: CommandState::Pending,
        })
    }
}

impl UndoableCommand for ReplaceCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<()> {
        let safety = ctx.safety;
        let others = self
            .others
            .iter()
            .map(|id| ctx.images.path(*id))
            .collect::<Result<Vec<_>>>()?;

        let mut staged = Vec::with_capacity(others.len() + 1);
        Staging::atomically(safety, |staging| {
            let target_temp = safety.temp_path(&self.target_path);
            staging.move_file(safety, &self.target_path, &target_temp)?;
            staged.push(StagedFile {
                original: self.target_path.clone(),
                temp: target_temp,
            });

            staging.move_file(safety, &self.source_path, &self.target_path)?;

            for original in others {
                let temp = safety.temp_path(&original);
                staging.move_file(safety, &original, &temp)?;
                staged.push(StagedFile { original, temp });
            }
            Ok(())
        })?;

        let mut gone = self.others.clone();
        gone.push(self.target);
        self.removed = ctx.results.remove_involving(&gone);
        ctx.images.set_path(self.source, self.target_path.clone())?;
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
            // staged[0] is the target, which must wait until the source has moved out
            for file in self.staged.iter().skip(1).rev() {
                staging.move_file(safety, &file.temp, &file.original)?;
            }
            staging.move_file(safety, &self.target_path, &self.source_path)?;
            if let Some(target) = self.staged.first() {
                staging.move_file(safety, &target.temp, &target.original)?;
            }
            Ok(())
        })?;

        ctx.images.set_path(self.source, self.source_path.clone())?;
        ctx.images.set_path(self.target, self.target_path.clone())?;
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
        let mut text = format!(
            "Replace '{}' with '{}'",
            file_name(&self.target_path),
            file_name(&self.source_path)
        );
        if !self.others.is_empty() {
            text.push_str(&format!(" and delete {} more", self.others.len()));
        }
        text
    }
}
