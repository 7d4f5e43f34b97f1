use std::path::PathBuf;

use super::{file_name, CommandContext, UndoableCommand};
use crate::error::Result;
use crate::store::ImageStore;
use crate::types::ImageId;

/// Moves one image to a new path; reversed by moving it back
#[derive(Debug)]
pub struct RenameCommand {
    image: ImageId,
    old_path: PathBuf,
    new_path: PathBuf,
}

impl RenameCommand {
    pub fn new(image: ImageId, new_path: impl Into<PathBuf>, images: &ImageStore) -> Result<Self> {
        Ok(Self {
            image,
            old_path: images.path(image)?,
            new_path: new_path.into(),
        })
    }
}

impl UndoableCommand for RenameCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<()> {
        ctx.safety.move_file(&self.old_path, &self.new_path)?;
        ctx.images.set_path(self.image, self.new_path.clone())?;
        Ok(())
    }

    fn unexecute(&mut self, ctx: &mut CommandContext<'_>) -> Result<()> {
        ctx.safety.move_file(&self.new_path, &self.old_path)?;
        ctx.images.set_path(self.image, self.old_path.clone())?;
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "Rename '{}' to '{}'",
            file_name(&self.old_path),
            file_name(&self.new_path)
        )
    }
}
