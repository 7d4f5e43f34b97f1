//! Persisted directory locations and the ignore list of dismissed pairs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::store::{ImageStore, ResultList};

/// A directory, optionally including everything below it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: PathBuf,
    pub search_subfolders: bool,
}

impl Location {
    pub fn new(path: impl Into<PathBuf>, search_subfolders: bool) -> Self {
        Self {
            path: path.into(),
            search_subfolders,
        }
    }

    /// Whether a file path lies inside this location
    pub fn contains(&self, file: &Path) -> bool {
        if self.search_subfolders {
            file.starts_with(&self.path)
        } else {
            file.parent() == Some(self.path.as_path())
        }
    }
}

/// Search, ignore or valid locations as saved between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSet {
    pub locations: Vec<Location>,
}

impl LocationSet {
    pub fn contains(&self, file: &Path) -> bool {
        self.locations.iter().any(|location| location.contains(file))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

/// A dismissed pair, stored by path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoredPair {
    pub first: PathBuf,
    pub second: PathBuf,
}

impl IgnoredPair {
    fn matches(&self, a: &Path, b: &Path) -> bool {
        (self.first == a && self.second == b) || (self.first == b && self.second == a)
    }
}

/// Pairs the user dismissed; they are dropped from future result lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreList {
    pub pairs: Vec<IgnoredPair>,
}

impl IgnoreList {
    /// Order of the two paths does not matter
    pub fn contains(&self, a: &Path, b: &Path) -> bool {
        self.pairs.iter().any(|pair| pair.matches(a, b))
    }

    pub fn add(&mut self, a: impl Into<PathBuf>, b: impl Into<PathBuf>) {
        let (a, b) = (a.into(), b.into());
        if !self.contains(&a, &b) {
            self.pairs.push(IgnoredPair {
                first: a,
                second: b,
            });
        }
    }

    /// Drop ignored pairs from a result list, returning how many were removed
    pub fn retain_results(&self, results: &mut ResultList, images: &ImageStore) -> usize {
        let before = results.len();
        results.retain(|result| {
            match (images.get(result.first), images.get(result.second)) {
                (Some(first), Some(second)) => !self.contains(&first.path, &second.path),
                _ => true,
            }
        });
        before - results.len()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = std::fs::File::open(path).map_err(|e| {
        Error::Configuration(format!("Failed to open {}: {}", path.display(), e))
    })?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| {
        Error::Configuration(format!("Failed to parse {}: {}", path.display(), e))
    })
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| {
        Error::Configuration(format!("Failed to create {}: {}", path.display(), e))
    })?;
    serde_json::to_writer_pretty(file, value).map_err(|e| {
        Error::Configuration(format!("Failed to write {}: {}", path.display(), e))
    })
}
