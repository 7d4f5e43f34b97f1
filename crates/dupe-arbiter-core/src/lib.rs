//! Core functionality for resolving duplicate images.
//!
//! This library provides the foundational components for acting on the
//! results of an external image comparison engine:
//! - Grouping pairwise results into duplicate groups
//! - Rule-based selection of the image to keep
//! - Reversible file operations with bounded undo/redo

// -- External Dependencies --
use log::{info, warn};
use std::path::PathBuf;

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use action::{ActionGenerator, ActionPlan, DirectoryFilter, GroupDecision, SkipReason};
pub use config::*;
pub use error::{Error, Result};
pub use types::*;

// -- Public Modules --
pub mod action;
pub mod command;
pub mod config;
pub mod filter;
pub mod grouping;
pub mod locations;
pub mod logging;
pub mod safety;
pub mod search;
pub mod selection;
pub mod store;
pub mod types;
pub mod utility;

use command::{CommandContext, DeleteCommand, RenameCommand, UndoRedoEngine, UndoableCommand};
use grouping::GroupBuilder;
use locations::IgnoreList;
use safety::SafetyManager;
use search::SearchEngine;
use store::{ImageStore, ResultList};
use utility::UtilityWeights;

/// Counts from applying every plan of a result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Main entry point: one result set, its file operations and their history
pub struct Session {
    config: Config,
    images: ImageStore,
    results: ResultList,
    safety: SafetyManager,
    history: UndoRedoEngine,
    ignore: IgnoreList,
}

impl Session {
    /// Create a new Session with the provided configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let safety = SafetyManager::new(&config);
        let history = UndoRedoEngine::new(config.undo_capacity);
        Ok(Self {
            config,
            images: ImageStore::new(),
            results: ResultList::new(),
            safety,
            history,
            ignore: IgnoreList::default(),
        })
    }

    /// Pairs in this list are dropped from every loaded result set
    pub fn with_ignore_list(mut self, ignore: IgnoreList) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn results(&self) -> &ResultList {
        &self.results
    }

    pub fn ignore_list(&self) -> &IgnoreList {
        &self.ignore
    }

    pub fn history(&self) -> &UndoRedoEngine {
        &self.history
    }

    /// Run the engine and load its results, replacing the current set.
    /// Pending deletions of the previous set are committed first.
    pub fn load_from(&mut self, engine: &mut dyn SearchEngine) -> Result<usize> {
        self.history.clear(&self.safety)?;
        self.images = ImageStore::new();
        self.results = ResultList::new();

        let loaded = search::load_results(
            engine,
            &mut self.images,
            &mut self.results,
            self.config.result_page_size,
        )?;
        let ignored = self.ignore.retain_results(&mut self.results, &self.images);
        if ignored > 0 {
            info!("Dropped {} ignored pairs", ignored);
        }
        self.recalculate_utility();
        Ok(loaded - ignored)
    }

    /// Groups of the current result list, rebuilt on every call
    pub fn groups(&self) -> Vec<DuplicateGroup> {
        GroupBuilder::new(self.config.grouping).build_groups(self.results.as_slice())
    }

    pub fn recalculate_utility(&mut self) {
        for group in self.groups() {
            utility::recalculate(&group, &mut self.images, &self.config.utility_weights);
        }
    }

    pub fn set_utility_weights(&mut self, weights: UtilityWeights) -> Result<()> {
        weights.validate()?;
        self.config.utility_weights = weights;
        self.recalculate_utility();
        Ok(())
    }

    pub fn generator(&self) -> ActionGenerator {
        ActionGenerator::from_config(&self.config)
    }

    /// A decision for every current group
    pub fn plan(&self) -> Vec<(DuplicateGroup, GroupDecision)> {
        let groups = self.groups();
        let decisions = self.generator().generate(&groups, &self.results, &self.images);
        groups.into_iter().zip(decisions).collect()
    }

    fn execute(&mut self, command: Box<dyn UndoableCommand>) -> Result<()> {
        let mut ctx = CommandContext {
            images: &mut self.images,
            results: &mut self.results,
            safety: &self.safety,
        };
        self.history.execute(command, &mut ctx)
    }

    pub fn apply_plan(&mut self, plan: ActionPlan) -> Result<()> {
        let command = plan.into_command(&self.images)?;
        self.execute(command)
    }

    /// Plan and apply every group. Failing groups are rolled back individually.
    pub fn apply_all(&mut self) -> Result<ApplySummary> {
        let mut summary = ApplySummary::default();
        for (group, decision) in self.plan() {
            match decision.outcome {
                Ok(plan) => match self.apply_plan(plan) {
                    Ok(()) => summary.applied += 1,
                    Err(e) => {
                        warn!("Group {:?} failed: {}", group.id, e);
                        summary.failed += 1;
                    }
                },
                Err(_) => summary.skipped += 1,
            }
        }
        info!(
            "Applied {} groups, skipped {}, failed {}",
            summary.applied, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    pub fn rename(&mut self, image: ImageId, new_path: impl Into<PathBuf>) -> Result<()> {
        let command = RenameCommand::new(image, new_path, &self.images)?;
        self.execute(Box::new(command))
    }

    pub fn delete(&mut self, image: ImageId) -> Result<()> {
        let command = DeleteCommand::single(image, &self.images)?;
        self.execute(Box::new(command))
    }

    pub fn delete_many(&mut self, images: Vec<ImageId>) -> Result<()> {
        self.execute(Box::new(DeleteCommand::multiple(images)))
    }

    pub fn undo(&mut self) -> Result<bool> {
        let mut ctx = CommandContext {
            images: &mut self.images,
            results: &mut self.results,
            safety: &self.safety,
        };
        self.history.undo(&mut ctx)
    }

    pub fn redo(&mut self) -> Result<bool> {
        let mut ctx = CommandContext {
            images: &mut self.images,
            results: &mut self.results,
            safety: &self.safety,
        };
        self.history.redo(&mut ctx)
    }

    /// Dismiss a pair for this and future result sets
    pub fn ignore(&mut self, result: ResultId) -> Result<()> {
        let pair = self
            .results
            .get(result)
            .ok_or_else(|| Error::Unknown(format!("No result {:?}", result)))?;
        let first = self.images.path(pair.first)?;
        let second = self.images.path(pair.second)?;
        self.ignore.add(first, second);
        self.results.retain(|r| r.id != result);
        Ok(())
    }

    /// Commit every pending deletion; nothing can be undone afterwards
    pub fn close(mut self) -> Result<IgnoreList> {
        self.history.clear(&self.safety)?;
        Ok(self.ignore)
    }
}
