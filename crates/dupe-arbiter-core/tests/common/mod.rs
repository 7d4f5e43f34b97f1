#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use dupe_arbiter_core::search::{
    EngineOptions, OptionsKind, RawPairResult, SearchEngine, SearchStatus, ThreadKind,
};
use dupe_arbiter_core::{Config, ImageId, ImageRecord, ResultKind, Session, TransformType};
use tempfile::TempDir;

/// Create a test image with dummy data unique to its name
pub fn create_test_image(dir: &Path, name: &str) -> PathBuf {
    let file_path = dir.join(name);
    let mut file = File::create(&file_path).unwrap();
    file.write_all(format!("DUMMY IMAGE DATA {}", name).as_bytes())
        .unwrap();
    file_path
}

/// Dummy data written for `name`
pub fn contents_of(name: &str) -> Vec<u8> {
    format!("DUMMY IMAGE DATA {}", name).into_bytes()
}

/// Temp directory of dummy images plus their records
pub struct TestLibrary {
    pub dir: TempDir,
}

impl TestLibrary {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Create the file and describe it with the given metrics
    pub fn image(&self, name: &str, file_size: u64, blockiness: f32) -> ImageRecord {
        let path = create_test_image(self.dir.path(), name);
        ImageRecord {
            file_size,
            blockiness,
            width: 640,
            height: 480,
            ..ImageRecord::new(path)
        }
    }

    pub fn read(&self, name: &str) -> Vec<u8> {
        fs::read(self.path(name)).unwrap()
    }
}

pub fn pair(first: &ImageRecord, second: &ImageRecord) -> RawPairResult {
    RawPairResult {
        first: first.clone(),
        second: Some(second.clone()),
        difference: 0.0,
        transform: TransformType::None,
        kind: ResultKind::DuplicatePair,
    }
}

/// Engine serving a fixed list of results
pub struct FixedEngine {
    pub results: Vec<RawPairResult>,
    pub fail: bool,
}

impl FixedEngine {
    pub fn new(results: Vec<RawPairResult>) -> Self {
        Self {
            results,
            fail: false,
        }
    }
}

impl SearchEngine for FixedEngine {
    fn search(&mut self) -> bool {
        !self.fail
    }

    fn result_count(&self) -> u32 {
        self.results.len() as u32
    }

    fn get_results(&self, start: u32, count: u32) -> Vec<RawPairResult> {
        self.results
            .iter()
            .skip(start as usize)
            .take(count as usize)
            .cloned()
            .collect()
    }

    fn status(&self, _kind: ThreadKind, _index: u32) -> SearchStatus {
        SearchStatus::default()
    }

    fn set_options(&mut self, _options: EngineOptions) -> bool {
        false
    }

    fn get_options(&self, _kind: OptionsKind) -> Option<EngineOptions> {
        None
    }
}

/// Configuration that deletes for good instead of using the recycle bin
pub fn test_config() -> Config {
    Config {
        use_recycle_bin: false,
        ..Config::default()
    }
}

pub fn session_with(config: Config, results: Vec<RawPairResult>) -> Session {
    let mut session = Session::new(config).unwrap();
    let mut engine = FixedEngine::new(results);
    session.load_from(&mut engine).unwrap();
    session
}

pub fn id_of(session: &Session, path: &Path) -> ImageId {
    session.images().find(path).unwrap()
}
