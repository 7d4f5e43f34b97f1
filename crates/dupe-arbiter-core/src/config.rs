use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::action::DirectoryFilter;
use crate::error::{Error, Result};
use crate::filter::FilterCondition;
use crate::grouping::GroupingStrategy;
use crate::locations::{read_json, write_json};
use crate::selection::{BestRule, PathRule};
use crate::utility::UtilityWeights;

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration for grouping, best-image selection and file operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of commands that can be undone before the oldest is committed
    pub undo_capacity: usize,

    /// Suffix appended to files staged for deletion
    pub temp_extension: String,

    /// Send committed deletions to the recycle bin instead of removing them
    pub use_recycle_bin: bool,

    /// How pair results are merged into groups
    pub grouping: GroupingStrategy,

    /// Best-by-property rules, applied in order
    pub best_rules: Vec<BestRule>,

    /// Values closer than this tie in best-by-property rules (0 = exact)
    pub tie_epsilon: f64,

    /// Best-by-path rule
    pub path_rule: PathRule,

    /// Which groups actions are generated for
    pub directory_filter: DirectoryFilter,

    /// Conditions every pair of a group must satisfy before acting on it
    pub conditions: Vec<FilterCondition>,

    /// Weights of the utility index
    pub utility_weights: UtilityWeights,

    /// Number of results fetched from the search engine per request
    pub result_page_size: u32,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            undo_capacity: 16,
            temp_extension: ".dupe-tmp".to_string(),
            use_recycle_bin: true,
            grouping: GroupingStrategy::UnionFind,
            best_rules: vec![
                BestRule::LowestBlockiness,
                BestRule::LowestBluring,
                BestRule::HighestResolution,
                BestRule::LargestFileSize,
            ],
            tie_epsilon: 0.0,
            path_rule: PathRule::default(),
            directory_filter: DirectoryFilter::Any,
            conditions: Vec::new(),
            utility_weights: UtilityWeights::default(),
            result_page_size: 1024,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dupe-arbiter").join("config.json"))
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        write_json(path, self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let ext = &self.temp_extension;
        if ext.len() < 2 || !ext.starts_with('.') || ext.contains(|c: char| c == '/' || c == '\\') {
            return Err(Error::Configuration(format!(
                "Temp extension must look like '.ext', got '{}'",
                ext
            )));
        }

        if !self.tie_epsilon.is_finite() || self.tie_epsilon < 0.0 {
            return Err(Error::Configuration(
                "Tie epsilon must be a non-negative number".to_string(),
            ));
        }

        if self.result_page_size == 0 {
            return Err(Error::Configuration(
                "Result page size must be at least 1".to_string(),
            ));
        }

        if let DirectoryFilter::Within(locations) = &self.directory_filter {
            if locations.is_empty() {
                return Err(Error::Configuration(
                    "Directory filter 'Within' needs at least one location".to_string(),
                ));
            }
        }

        self.utility_weights.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ComparisonMode, PairMetric, Property};
    use tempfile::tempdir;

    #[test]
    fn test_default_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_ext = Config {
            temp_extension: "tmp".to_string(),
            ..Config::default()
        };
        assert!(matches!(bad_ext.validate(), Err(Error::Configuration(_))));

        let bad_epsilon = Config {
            tie_epsilon: -1.0,
            ..Config::default()
        };
        assert!(bad_epsilon.validate().is_err());

        let empty_within = Config {
            directory_filter: DirectoryFilter::Within(Vec::new()),
            ..Config::default()
        };
        assert!(empty_within.validate().is_err());
    }

    #[test]
    fn test_round_trip_through_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");
        let config = Config {
            undo_capacity: 3,
            conditions: vec![FilterCondition::Pair {
                metric: PairMetric::PropertyDifferencePercent(Property::FileSize),
                mode: ComparisonMode::Less,
                threshold: 10.0,
            }],
            ..Config::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.undo_capacity, 3);
        assert_eq!(loaded.conditions, config.conditions);
        assert_eq!(loaded.best_rules, config.best_rules);
    }

    #[test]
    fn test_unknown_parameter_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "conditions": [ { "Pair": { "metric": "Sharpness", "mode": "Less", "threshold": 1.0 } } ] }"#,
        )
        .unwrap();
        assert!(matches!(Config::from_file(&path), Err(Error::Configuration(_))));

        std::fs::write(
            &path,
            r#"{ "conditions": [ { "Pair": { "metric": "Difference", "threshold": 1.0 } } ] }"#,
        )
        .unwrap();
        assert!(matches!(Config::from_file(&path), Err(Error::Configuration(_))));
    }
}
