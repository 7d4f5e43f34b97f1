//! Contract with the external comparison engine.
//!
//! The engine computes the image metrics and pairwise differences; this
//! crate only consumes its results. [`JsonResultSource`] stands in for it
//! with results exported to a JSON file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::locations::read_json;
use crate::store::{ImageStore, ResultList};
use crate::types::{ImageRecord, ResultKind, TransformType};

/// A result as the engine reports it, with both records inline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPairResult {
    pub first: ImageRecord,
    /// Absent for defect results
    #[serde(default)]
    pub second: Option<ImageRecord>,
    #[serde(default)]
    pub difference: f64,
    #[serde(default)]
    pub transform: TransformType,
    #[serde(default)]
    pub kind: ResultKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadKind {
    Main,
    Collect,
    Compare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThreadState {
    #[default]
    Idle,
    Work,
    Wait,
    Finished,
}

/// Progress of one engine thread
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStatus {
    pub state: ThreadState,
    pub current_path: Option<PathBuf>,
    pub current: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub search_subfolders: bool,
    pub include_hidden: bool,
    pub extensions: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            search_subfolders: true,
            include_hidden: false,
            extensions: ["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "heic"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompareAlgorithm {
    #[default]
    SquaredSum,
    Ssim,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareOptions {
    pub check_on_equality: bool,
    pub transformed_image: bool,
    pub type_control: bool,
    /// Results with a larger difference are dropped
    pub threshold_difference: f64,
    pub minimal_image_size: u32,
    pub maximal_image_size: u32,
    pub algorithm: CompareAlgorithm,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            check_on_equality: true,
            transformed_image: false,
            type_control: false,
            threshold_difference: 5.0,
            minimal_image_size: 64,
            maximal_image_size: 8192,
            algorithm: CompareAlgorithm::SquaredSum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectOptions {
    pub check_on_defect: bool,
    pub check_on_blockiness: bool,
    pub blockiness_threshold: f32,
    pub check_on_bluring: bool,
    pub bluring_threshold: f32,
}

impl Default for DefectOptions {
    fn default() -> Self {
        Self {
            check_on_defect: true,
            check_on_blockiness: false,
            blockiness_threshold: 10.0,
            check_on_bluring: false,
            bluring_threshold: 16.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedOptions {
    pub compare_thread_count: u32,
    pub collect_thread_count: u32,
    pub reduced_image_size: u32,
    pub result_count_max: u32,
}

impl Default for AdvancedOptions {
    fn default() -> Self {
        Self {
            compare_thread_count: 0,
            collect_thread_count: 0,
            reduced_image_size: 32,
            result_count_max: 100_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionsKind {
    Search,
    Compare,
    Defect,
    Advanced,
}

/// One option block of the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineOptions {
    Search(SearchOptions),
    Compare(CompareOptions),
    Defect(DefectOptions),
    Advanced(AdvancedOptions),
}

impl EngineOptions {
    pub fn kind(&self) -> OptionsKind {
        match self {
            Self::Search(_) => OptionsKind::Search,
            Self::Compare(_) => OptionsKind::Compare,
            Self::Defect(_) => OptionsKind::Defect,
            Self::Advanced(_) => OptionsKind::Advanced,
        }
    }
}

/// Decoded pixels handed out for thumbnails
#[derive(Debug, Clone)]
pub struct RawBitmap {
    pub width: u32,
    pub height: u32,
    /// 32-bit BGRA rows
    pub pixels: Vec<u8>,
}

/// What the crate needs from a comparison engine. Failures are plain booleans.
pub trait SearchEngine {
    /// Run the comparison; `false` on failure
    fn search(&mut self) -> bool;

    fn result_count(&self) -> u32;

    /// Page of results starting at `start`
    fn get_results(&self, start: u32, count: u32) -> Vec<RawPairResult>;

    fn status(&self, kind: ThreadKind, index: u32) -> SearchStatus;

    fn set_options(&mut self, options: EngineOptions) -> bool;

    fn get_options(&self, kind: OptionsKind) -> Option<EngineOptions>;

    /// Decode an image the caller cannot read itself
    fn load_bitmap(&self, _path: &Path) -> Option<RawBitmap> {
        None
    }
}

/// Run a search and pull every result into the store, page by page
pub fn load_results(
    engine: &mut dyn SearchEngine,
    images: &mut ImageStore,
    results: &mut ResultList,
    page_size: u32,
) -> Result<usize> {
    if !engine.search() {
        return Err(Error::Search("comparison engine reported a failure".to_string()));
    }

    let total = engine.result_count();
    let page_size = page_size.max(1);
    let mut loaded = 0;
    let mut start = 0;
    while start < total {
        let page = engine.get_results(start, page_size.min(total - start));
        if page.is_empty() {
            log::warn!("Engine returned an empty page at {} of {}", start, total);
            break;
        }
        for raw in page {
            let first = images.intern(raw.first);
            let second = match raw.second {
                Some(record) => images.intern(record),
                None => first,
            };
            results.push(first, second, raw.difference, raw.transform, raw.kind);
            loaded += 1;
        }
        start += page_size;
    }

    log::info!("Loaded {} results for {} images", loaded, images.len());
    Ok(loaded)
}

/// Engine stand-in reading results exported to a JSON array
#[derive(Debug)]
pub struct JsonResultSource {
    path: PathBuf,
    results: Vec<RawPairResult>,
    search: SearchOptions,
    compare: CompareOptions,
    defect: DefectOptions,
    advanced: AdvancedOptions,
    status: SearchStatus,
}

impl JsonResultSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            results: Vec::new(),
            search: SearchOptions::default(),
            compare: CompareOptions::default(),
            defect: DefectOptions::default(),
            advanced: AdvancedOptions::default(),
            status: SearchStatus::default(),
        }
    }

    fn keep(&self, raw: &RawPairResult) -> bool {
        match raw.kind {
            ResultKind::Defect => self.defect.check_on_defect,
            ResultKind::DuplicatePair => {
                let Some(second) = &raw.second else {
                    return false;
                };
                (self.compare.transformed_image || raw.transform == TransformType::None)
                    && raw.difference <= self.compare.threshold_difference
                    && (!self.compare.type_control || raw.first.format == second.format)
            }
        }
    }
}

impl SearchEngine for JsonResultSource {
    fn search(&mut self) -> bool {
        self.status = SearchStatus {
            state: ThreadState::Work,
            current_path: Some(self.path.clone()),
            ..SearchStatus::default()
        };
        let loaded: Vec<RawPairResult> = match read_json(&self.path) {
            Ok(loaded) => loaded,
            Err(e) => {
                log::error!("Failed to load results from {}: {}", self.path.display(), e);
                self.status.state = ThreadState::Idle;
                return false;
            }
        };

        let total = loaded.len() as u64;
        let limit = self.advanced.result_count_max as usize;
        self.results = loaded
            .into_iter()
            .filter(|raw| self.keep(raw))
            .take(limit)
            .collect();
        self.status = SearchStatus {
            state: ThreadState::Finished,
            current_path: None,
            current: total,
            total,
        };
        true
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

    fn status(&self, kind: ThreadKind, index: u32) -> SearchStatus {
        match (kind, index) {
            (ThreadKind::Main, 0) => self.status.clone(),
            _ => SearchStatus::default(),
        }
    }

    fn set_options(&mut self, options: EngineOptions) -> bool {
        match options {
            EngineOptions::Search(options) => self.search = options,
            EngineOptions::Compare(options) => self.compare = options,
            EngineOptions::Defect(options) => self.defect = options,
            EngineOptions::Advanced(options) => self.advanced = options,
        }
        true
    }

    fn get_options(&self, kind: OptionsKind) -> Option<EngineOptions> {
        Some(match kind {
            OptionsKind::Search => EngineOptions::Search(self.search.clone()),
            OptionsKind::Compare => EngineOptions::Compare(self.compare.clone()),
            OptionsKind::Defect => EngineOptions::Defect(self.defect.clone()),
            OptionsKind::Advanced => EngineOptions::Advanced(self.advanced.clone()),
        })
    }
}
