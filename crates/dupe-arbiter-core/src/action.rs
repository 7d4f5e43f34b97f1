//! Deciding what to do with each duplicate group.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::command::{DeleteCommand, ReplaceCommand, UndoableCommand};
use crate::config::Config;
use crate::error::Result;
use crate::filter::FilterCondition;
use crate::locations::Location;
use crate::selection::{BestImageSelector, PathRule};
use crate::store::{ImageStore, ResultList};
use crate::types::{DuplicateGroup, GroupId, ImageId};

/// Why no plan was produced for a group
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    #[error("group has no images")]
    EmptyGroup,

    #[error("unknown image handle {0:?}")]
    UnknownImage(ImageId),

    #[error("rejected by directory filter")]
    DirectoryFilter,

    #[error("condition #{0} not met by every pair")]
    ConditionNotMet(usize),

    #[error("best-image rules do not agree on a winner")]
    NoConsensus,

    #[error("no ordinal in file name {0}")]
    NoOrdinal(PathBuf),

    #[error("ordinal in file name {0} is too large")]
    OrdinalOutOfRange(PathBuf),

    #[error("several files share the winning ordinal {0}")]
    OrdinalTie(u64),
}

/// Which groups the generator may act on, by directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectoryFilter {
    #[default]
    Any,
    /// Every member lives in one directory
    SameDirectory,
    /// Members span more than one directory
    DifferentDirectories,
    /// Every member lies inside one of the locations
    Within(Vec<Location>),
}

impl DirectoryFilter {
    pub fn accepts(&self, paths: &[&Path]) -> bool {
        let directories = || paths.iter().map(|path| path.parent()).collect::<HashSet<_>>();
        match self {
            Self::Any => true,
            Self::SameDirectory => directories().len() <= 1,
            Self::DifferentDirectories => directories().len() > 1,
            Self::Within(locations) => paths
                .iter()
                .all(|path| locations.iter().any(|location| location.contains(path))),
        }
    }
}

/// What to do with one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPlan {
    /// Keep `keep`, stage everything in `delete`
    DeleteOthers { keep: ImageId, delete: Vec<ImageId> },

    /// Move `source` onto `target`'s path, stage `target` and `delete`
    Replace {
        source: ImageId,
        target: ImageId,
        delete: Vec<ImageId>,
    },
}

impl ActionPlan {
    /// The image that survives, under its final path
    pub fn survivor(&self) -> ImageId {
        match self {
            Self::DeleteOthers { keep, .. } => *keep,
            Self::Replace { source, .. } => *source,
        }
    }

    pub fn into_command(self, images: &ImageStore) -> Result<Box<dyn UndoableCommand>> {
        Ok(match self {
            Self::DeleteOthers { keep, delete } => {
                Box::new(DeleteCommand::others(keep, delete, images)?)
            }
            Self::Replace {
                source,
                target,
                delete,
            } => Box::new(ReplaceCommand::new(source, target, delete, images)?),
        })
    }
}

/// Outcome of action generation for one group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDecision {
    pub group: GroupId,
    pub outcome: std::result::Result<ActionPlan, SkipReason>,
}

/// Combines best-by-property and best-by-path into a plan per group
#[derive(Debug, Clone, Default)]
pub struct ActionGenerator {
    selector: BestImageSelector,
    path_rule: PathRule,
    directory_filter: DirectoryFilter,
    conditions: Vec<FilterCondition>,
}

impl ActionGenerator {
    pub fn new(selector: BestImageSelector, path_rule: PathRule) -> Self {
        Self {
            selector,
            path_rule,
            directory_filter: DirectoryFilter::Any,
            conditions: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let selector =
            BestImageSelector::new(config.best_rules.clone()).with_tie_epsilon(config.tie_epsilon);
        Self::new(selector, config.path_rule)
            .with_directory_filter(config.directory_filter.clone())
            .with_conditions(config.conditions.clone())
    }

    pub fn with_directory_filter(mut self, filter: DirectoryFilter) -> Self {
        self.directory_filter = filter;
        self
    }

    /// Conditions every pair of a group must satisfy
    pub fn with_conditions(mut self, conditions: Vec<FilterCondition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn get_action(
        &self,
        group: &DuplicateGroup,
        results: &ResultList,
        images: &ImageStore,
    ) -> std::result::Result<ActionPlan, SkipReason> {
        if group.files.is_empty() {
            return Err(SkipReason::EmptyGroup);
        }

        let paths = group
            .files
            .iter()
            .map(|id| {
                images
                    .get(*id)
                    .map(|record| record.path.as_path())
                    .ok_or(SkipReason::UnknownImage(*id))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if !self.directory_filter.accepts(&paths) {
            return Err(SkipReason::DirectoryFilter);
        }

        if let Some(index) = self
            .conditions
            .iter()
            .position(|condition| !condition.is_group_selected(group, results, images))
        {
            return Err(SkipReason::ConditionNotMet(index));
        }

        let bests_by_property = self.selector.get_best(&group.files, images);
        let Some(&first_best) = bests_by_property.first() else {
            return Err(SkipReason::NoConsensus);
        };
        let best_by_path = self.path_rule.best(&group.files, images)?;

        if bests_by_property.contains(&best_by_path) {
            Ok(ActionPlan::DeleteOthers {
                keep: best_by_path,
                delete: others(&group.files, &[best_by_path]),
            })
        } else {
            Ok(ActionPlan::Replace {
                source: first_best,
                target: best_by_path,
                delete: others(&group.files, &[first_best, best_by_path]),
            })
        }
    }

    /// One decision per group; a skipped group never stops the others
    pub fn generate(
        &self,
        groups: &[DuplicateGroup],
        results: &ResultList,
        images: &ImageStore,
    ) -> Vec<GroupDecision> {
        groups
            .iter()
            .map(|group| {
                let outcome = self.get_action(group, results, images);
                if let Err(reason) = &outcome {
                    log::debug!("Skipping group {:?}: {}", group.id, reason);
                }
                GroupDecision {
                    group: group.id,
                    outcome,
                }
            })
            .collect()
    }
}

fn others(files: &[ImageId], keep: &[ImageId]) -> Vec<ImageId> {
    files
        .iter()
        .filter(|id| !keep.contains(id))
        .copied()
        .collect()
}
