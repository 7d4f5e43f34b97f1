//! File-system primitives used by the commands.
//!
//! Deletion happens in two steps: the file is first renamed to
//! `path + temp_extension`, which can be undone, and only later committed
//! to the recycle bin or removed for good.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::locations::Location;
use crate::logging::{log_file_error, log_fs_modification};

#[derive(Debug, Clone)]
pub struct SafetyManager {
    temp_extension: String,
    use_recycle_bin: bool,
}

impl SafetyManager {
    /// Create a new SafetyManager with the provided configuration
    pub fn new(config: &Config) -> Self {
        Self {
            temp_extension: config.temp_extension.clone(),
            use_recycle_bin: config.use_recycle_bin,
        }
    }

    pub fn temp_extension(&self) -> &str {
        &self.temp_extension
    }

    /// `path` with the temp extension appended to its file name
    pub fn temp_path(&self, path: &Path) -> PathBuf {
        let mut name: OsString = path.as_os_str().to_owned();
        name.push(&self.temp_extension);
        PathBuf::from(name)
    }

    /// Original path of a temp file, or `None` if it lacks the temp extension
    pub fn original_path(&self, temp: &Path) -> Option<PathBuf> {
        let name = temp.to_str()?;
        let original = name.strip_suffix(self.temp_extension.as_str())?;
        (!original.is_empty()).then(|| PathBuf::from(original))
    }

    /// Move a file, refusing to overwrite an existing destination
    pub fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        if !from.exists() {
            return Err(Error::FileNotFound(from.to_path_buf()));
        }
        if to.exists() {
            return Err(Error::AlreadyExists(to.to_path_buf()));
        }
        fs::rename(from, to).map_err(|e| {
            log_file_error(from, "move", &e);
            Error::Io(e)
        })?;
        log_fs_modification("move", from, Some(&format!("to {}", to.display())));
        Ok(())
    }

    /// Rename a file to its temp path and return that path
    pub fn stage_delete(&self, path: &Path) -> Result<PathBuf> {
        let temp = self.temp_path(path);
        self.move_file(path, &temp)?;
        Ok(temp)
    }

    /// Final, non-reversible step of a delete
    pub fn commit_delete(&self, temp: &Path) -> Result<()> {
        if !temp.exists() {
            return Err(Error::FileNotFound(temp.to_path_buf()));
        }
        if self.use_recycle_bin {
            trash::delete(temp).map_err(|e| {
                log_file_error(temp, "recycle", &e);
                Error::Unknown(format!("Failed to recycle {}: {}", temp.display(), e))
            })?;
            log_fs_modification("recycle", temp, None);
        } else {
            fs::remove_file(temp).map_err(|e| {
                log_file_error(temp, "delete", &e);
                Error::Io(e)
            })?;
            log_fs_modification("delete", temp, None);
        }
        Ok(())
    }

    /// Temp files left behind by an interrupted session
    pub fn find_orphaned_temp_files(&self, locations: &[Location]) -> Vec<PathBuf> {
        let mut orphans = Vec::new();
        for location in locations {
            let max_depth = if location.search_subfolders { usize::MAX } else { 1 };
            for entry in WalkDir::new(&location.path)
                .max_depth(max_depth)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if self.original_path(entry.path()).is_some() {
                    orphans.push(entry.path().to_path_buf());
                }
            }
        }
        orphans.sort();
        orphans.dedup();
        orphans
    }

    /// Move an orphaned temp file back to its original path
    pub fn recover(&self, temp: &Path) -> Result<PathBuf> {
        let original = self.original_path(temp).ok_or_else(|| {
            Error::Configuration(format!(
                "{} does not end with {}",
                temp.display(),
                self.temp_extension
            ))
        })?;
        self.move_file(temp, &original)?;
        Ok(original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manager() -> SafetyManager {
        SafetyManager::new(&Config {
            use_recycle_bin: false,
            ..Config::default()
        })
    }

    #[test]
    fn test_temp_path_round_trip() {
        let safety = manager();
        let temp = safety.temp_path(Path::new("/p/a.jpg"));
        assert_eq!(temp, PathBuf::from(format!("/p/a.jpg{}", safety.temp_extension())));
        assert_eq!(safety.original_path(&temp), Some(PathBuf::from("/p/a.jpg")));
        assert_eq!(safety.original_path(Path::new("/p/a.jpg")), None);
    }

    #[test]
    fn test_stage_and_commit() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join("a.jpg");
        fs::write(&file, b"data").unwrap();

        let safety = manager();
        let temp = safety.stage_delete(&file).unwrap();
        assert!(!file.exists());
        assert!(temp.exists());

        safety.commit_delete(&temp).unwrap();
        assert!(!temp.exists());
    }

    #[test]
    fn test_move_refuses_overwrite() {
        let temp_dir = tempdir().unwrap();
        let a = temp_dir.path().join("a.jpg");
        let b = temp_dir.path().join("b.jpg");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();

        let safety = manager();
        assert!(matches!(safety.move_file(&a, &b), Err(Error::AlreadyExists(_))));
        assert!(matches!(
            safety.move_file(&temp_dir.path().join("missing.jpg"), &a),
            Err(Error::FileNotFound(_))
        ));
    }

    #[test]
    fn test_orphan_recovery() {
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        let top = temp_dir.path().join("a.jpg");
        let deep = nested.join("b.jpg");
        fs::write(&top, b"a").unwrap();
        fs::write(&deep, b"b").unwrap();

        let safety = manager();
        let top_temp = safety.stage_delete(&top).unwrap();
        let deep_temp = safety.stage_delete(&deep).unwrap();

        let flat = safety.find_orphaned_temp_files(&[Location::new(temp_dir.path(), false)]);
        assert_eq!(flat, vec![top_temp.clone()]);

        let all = safety.find_orphaned_temp_files(&[Location::new(temp_dir.path(), true)]);
        assert_eq!(all.len(), 2);
        assert!(all.contains(&deep_temp));

        assert_eq!(safety.recover(&top_temp).unwrap(), top);
        assert!(top.exists());
    }
}
