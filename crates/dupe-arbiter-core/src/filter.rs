//! Configurable predicates over pair results and groups.

use serde::{Deserialize, Serialize};

use crate::store::{ImageStore, ResultList};
use crate::types::{DuplicateGroup, DuplicatePairResult, ImageRecord, TransformType};

/// How an observed value is compared against the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonMode {
    Equal,
    Less,
    More,
}

impl ComparisonMode {
    pub fn compare(self, observed: f64, threshold: f64) -> bool {
        match self {
            Self::Equal => observed == threshold,
            Self::Less => observed < threshold,
            Self::More => observed > threshold,
        }
    }
}

/// Per-image property a condition can look at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Property {
    Blockiness,
    Bluring,
    Resolution,
    JpegPeaks,
    FileSize,
}

impl Property {
    pub fn value(self, record: &ImageRecord) -> f64 {
        match self {
            Self::Blockiness => record.blockiness as f64,
            Self::Bluring => record.bluring as f64,
            Self::Resolution => record.resolution() as f64,
            Self::JpegPeaks => record.jpeg_peaks as f64,
            Self::FileSize => record.file_size as f64,
        }
    }
}

/// Which images of a pair must satisfy a per-image condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// At least one of the two
    Any,
    Both,
}

/// Value derived from a whole pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairMetric {
    /// Difference score reported by the engine
    Difference,
    /// Absolute difference of a property
    PropertyDifference(Property),
    /// Difference of a property relative to the larger value, in percent
    PropertyDifferencePercent(Property),
}

impl PairMetric {
    pub fn observe(self, pair: &DuplicatePairResult, first: &ImageRecord, second: &ImageRecord) -> f64 {
        match self {
            Self::Difference => pair.difference,
            Self::PropertyDifference(property) => {
                (property.value(first) - property.value(second)).abs()
            }
            Self::PropertyDifferencePercent(property) => {
                difference_percent(property.value(first), property.value(second))
            }
        }
    }
}

/// `100 - 100 * min / max`, or 0 when both values are equal
pub fn difference_percent(a: f64, b: f64) -> f64 {
    let (min, max) = if a < b { (a, b) } else { (b, a) };
    if max - min == 0.0 || max == 0.0 {
        return 0.0;
    }
    100.0 - 100.0 * min / max
}

/// A single predicate over a pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterCondition {
    Pair {
        metric: PairMetric,
        mode: ComparisonMode,
        threshold: f64,
    },
    Image {
        property: Property,
        side: Side,
        mode: ComparisonMode,
        threshold: f64,
    },
    /// No rotation or flip was needed to align the pair
    NoTransform,
    SameImageType,
}

impl FilterCondition {
    /// Evaluate against a pair; pairs with unknown images are never selected
    pub fn is_selected(&self, pair: &DuplicatePairResult, images: &ImageStore) -> bool {
        let (Some(first), Some(second)) = (images.get(pair.first), images.get(pair.second)) else {
            return false;
        };

        match self {
            Self::Pair {
                metric,
                mode,
                threshold,
            } => mode.compare(metric.observe(pair, first, second), *threshold),
            Self::Image {
                property,
                side,
                mode,
                threshold,
            } => {
                let first_ok = mode.compare(property.value(first), *threshold);
                let second_ok = mode.compare(property.value(second), *threshold);
                match side {
                    Side::Any => first_ok || second_ok,
                    Side::Both => first_ok && second_ok,
                }
            }
            Self::NoTransform => pair.transform == TransformType::None,
            Self::SameImageType => first.format == second.format,
        }
    }

    /// A group is selected only if every one of its pairs is
    pub fn is_group_selected(
        &self,
        group: &DuplicateGroup,
        results: &ResultList,
        images: &ImageStore,
    ) -> bool {
        group
            .results
            .iter()
            .filter_map(|id| results.get(*id))
            .all(|pair| self.is_selected(pair, images))
    }
}
