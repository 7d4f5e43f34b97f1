use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Supported image formats
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    Webp,
    Heic,
    Other(String),
}

impl ImageFormat {
    /// Determine format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" | "jfif" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "bmp" | "dib" => Self::Bmp,
            "tif" | "tiff" => Self::Tiff,
            "webp" => Self::Webp,
            "heic" | "heif" => Self::Heic,
            other => Self::Other(other.to_string()),
        }
    }

    /// Determine format from the extension of a path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or_else(|| Self::Other(String::new()))
    }
}

/// Opaque handle of an image record inside an [`ImageStore`](crate::store::ImageStore)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(pub(crate) u32);

/// Opaque handle of a pair result; ordering follows the search order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultId(pub(crate) u64);

/// Per-file metrics reported by the comparison engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredImageRecord")]
pub struct ImageRecord {
    /// Full path to the image file, unique within a run
    pub path: PathBuf,

    /// File size in bytes
    pub file_size: u64,

    pub width: u32,
    pub height: u32,

    /// JPEG block-artifact severity, lower is better
    pub blockiness: f32,

    /// Blur severity, lower is better
    pub bluring: f32,

    /// Number of DCT histogram peaks
    pub jpeg_peaks: u32,

    /// Composite score in [0, 1], see [`crate::utility`]
    #[serde(default)]
    pub utility_index: f64,

    /// Image format; derived from the extension when an export omits it
    pub format: ImageFormat,
}

#[derive(Deserialize)]
struct StoredImageRecord {
    path: PathBuf,
    file_size: u64,
    width: u32,
    height: u32,
    blockiness: f32,
    bluring: f32,
    jpeg_peaks: u32,
    #[serde(default)]
    utility_index: f64,
    #[serde(default)]
    format: Option<ImageFormat>,
}

impl From<StoredImageRecord> for ImageRecord {
    fn from(stored: StoredImageRecord) -> Self {
        let format = stored
            .format
            .unwrap_or_else(|| ImageFormat::from_path(&stored.path));
        Self {
            path: stored.path,
            file_size: stored.file_size,
            width: stored.width,
            height: stored.height,
            blockiness: stored.blockiness,
            bluring: stored.bluring,
            jpeg_peaks: stored.jpeg_peaks,
            utility_index: stored.utility_index,
            format,
        }
    }
}

impl ImageRecord {
    /// Create a record with zeroed metrics; the format is derived from the extension
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = ImageFormat::from_path(&path);
        Self {
            path,
            file_size: 0,
            width: 0,
            height: 0,
            blockiness: 0.0,
            bluring: 0.0,
            jpeg_peaks: 0,
            utility_index: 0.0,
            format,
        }
    }

    /// Pixel count
    pub fn resolution(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Rotation or flip applied to the second image of a pair to align it with the first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransformType {
    #[default]
    None,
    Turn90,
    Turn180,
    Turn270,
    MirrorTurn0,
    MirrorTurn90,
    MirrorTurn180,
    MirrorTurn270,
}

/// What a result describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResultKind {
    #[default]
    DuplicatePair,
    /// Single defective image; `second` equals `first`
    Defect,
}

/// A pair of images the engine considers duplicates
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicatePairResult {
    pub id: ResultId,
    pub first: ImageId,
    pub second: ImageId,

    /// Difference score, 0 means identical
    pub difference: f64,

    pub transform: TransformType,
    pub kind: ResultKind,
}

impl DuplicatePairResult {
    /// Whether the result references the given image
    pub fn involves(&self, image: ImageId) -> bool {
        self.first == image || self.second == image
    }
}

/// Stable index of a group within one grouping pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub usize);

/// Cluster of mutually duplicate images
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub id: GroupId,

    /// Members in order of first appearance, without duplicates
    pub files: Vec<ImageId>,

    /// Results that produced this group, in input order
    pub results: Vec<ResultId>,
}

impl DuplicateGroup {
    pub(crate) fn new(id: GroupId) -> Self {
        Self {
            id,
            files: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn contains(&self, image: ImageId) -> bool {
        self.files.contains(&image)
    }

    pub(crate) fn add_result(&mut self, result: &DuplicatePairResult) {
        for image in [result.first, result.second] {
            if !self.files.contains(&image) {
                self.files.push(image);
            }
        }
        self.results.push(result.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(ImageFormat::from_path(Path::new("a/b.JPG")), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_path(Path::new("b.tif")), ImageFormat::Tiff);
        assert_eq!(
            ImageFormat::from_path(Path::new("noext")),
            ImageFormat::Other(String::new())
        );
    }

    #[test]
    fn test_resolution_does_not_overflow() {
        let mut record = ImageRecord::new("big.png");
        record.width = u32::MAX;
        record.height = 2;
        assert_eq!(record.resolution(), u32::MAX as u64 * 2);
    }

    #[test]
    fn test_missing_format_comes_from_extension() {
        let json = r#"{"path": "/p/a.PNG", "file_size": 10, "width": 2, "height": 2,
            "blockiness": 0.0, "bluring": 0.0, "jpeg_peaks": 0}"#;
        let record: ImageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.format, ImageFormat::Png);

        let json = r#"{"path": "/p/a.PNG", "file_size": 10, "width": 2, "height": 2,
            "blockiness": 0.0, "bluring": 0.0, "jpeg_peaks": 0, "format": "Jpeg"}"#;
        let record: ImageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.format, ImageFormat::Jpeg);
    }
}
