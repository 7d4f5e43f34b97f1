//! Picking the image to keep inside a duplicate group.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::action::SkipReason;
use crate::store::ImageStore;
use crate::types::{ImageId, ImageRecord};

/// Criteria for the best image, applied in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BestRule {
    SmallestFileSize,
    LargestFileSize,
    LowestBlockiness,
    LowestBluring,
    FewestJpegPeaks,
    HighestResolution,
    LowestResolution,
    HighestUtilityIndex,
}

impl BestRule {
    fn value(self, record: &ImageRecord) -> f64 {
        match self {
            Self::SmallestFileSize | Self::LargestFileSize => record.file_size as f64,
            Self::LowestBlockiness => record.blockiness as f64,
            Self::LowestBluring => record.bluring as f64,
            Self::FewestJpegPeaks => record.jpeg_peaks as f64,
            Self::HighestResolution | Self::LowestResolution => record.resolution() as f64,
            Self::HighestUtilityIndex => record.utility_index,
        }
    }

    fn prefers_larger(self) -> bool {
        matches!(
            self,
            Self::LargestFileSize | Self::HighestResolution | Self::HighestUtilityIndex
        )
    }

    /// Candidates sharing the best value; values within `epsilon` tie
    pub fn winners(self, candidates: &[ImageId], images: &ImageStore, epsilon: f64) -> Vec<ImageId> {
        let values: Vec<(ImageId, f64)> = candidates
            .iter()
            .filter_map(|id| images.get(*id).map(|record| (*id, self.value(record))))
            .collect();

        let best = values.iter().map(|(_, value)| *value).reduce(|a, b| {
            if self.prefers_larger() {
                a.max(b)
            } else {
                a.min(b)
            }
        });
        let Some(best) = best else {
            return Vec::new();
        };

        values
            .into_iter()
            .filter(|(_, value)| (value - best).abs() <= epsilon)
            .map(|(id, _)| id)
            .collect()
    }
}

/// Narrows a candidate set by a prioritized list of [`BestRule`]s
#[derive(Debug, Clone, Default)]
pub struct BestImageSelector {
    rules: Vec<BestRule>,
    tie_epsilon: f64,
}

impl BestImageSelector {
    pub fn new(rules: Vec<BestRule>) -> Self {
        Self {
            rules,
            tie_epsilon: 0.0,
        }
    }

    /// Treat values closer than `epsilon` as equal; the default is exact equality
    pub fn with_tie_epsilon(mut self, epsilon: f64) -> Self {
        self.tie_epsilon = epsilon;
        self
    }

    /// Best candidates, in input order.
    ///
    /// Each rule is evaluated over the full candidate list and intersected with
    /// the survivors of the previous rules. An empty result means the rules
    /// disagree; more than one image means they tie.
    pub fn get_best(&self, candidates: &[ImageId], images: &ImageStore) -> Vec<ImageId> {
        let mut working = candidates.to_vec();
        for rule in &self.rules {
            if working.len() <= 1 {
                break;
            }
            let winners = rule.winners(candidates, images, self.tie_epsilon);
            working.retain(|id| winners.contains(id));
            log::trace!("{:?} left {} candidates", rule, working.len());
        }
        working
    }
}

/// Where the ordinal is read from in a file stem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrdinalSource {
    /// `0012_holiday.jpg` -> 12
    BeforeUnderscore,
    /// `holiday_0012.jpg` -> 12
    AfterLastUnderscore,
    /// `12holiday.jpg` -> 12
    LeadingDigits,
    /// `holiday (12).jpg` is not matched, `holiday12.jpg` -> 12
    TrailingDigits,
}

static BEFORE_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)_").expect("valid ordinal regex"));
static AFTER_LAST_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_(\d+)$").expect("valid ordinal regex"));
static LEADING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)").expect("valid ordinal regex"));
static TRAILING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)$").expect("valid ordinal regex"));

impl OrdinalSource {
    fn regex(self) -> &'static Regex {
        match self {
            Self::BeforeUnderscore => &BEFORE_UNDERSCORE,
            Self::AfterLastUnderscore => &AFTER_LAST_UNDERSCORE,
            Self::LeadingDigits => &LEADING_DIGITS,
            Self::TrailingDigits => &TRAILING_DIGITS,
        }
    }
}

/// Whether the smaller or the larger ordinal wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrdinalPreference {
    Lowest,
    Highest,
}

/// Best-by-path rule based on a number embedded in the file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRule {
    pub source: OrdinalSource,
    pub preference: OrdinalPreference,
}

impl Default for PathRule {
    fn default() -> Self {
        Self {
            source: OrdinalSource::BeforeUnderscore,
            preference: OrdinalPreference::Lowest,
        }
    }
}

impl PathRule {
    /// Ordinal of a path, if its file stem has one that fits in a `u64`
    pub fn ordinal(&self, path: &Path) -> Option<u64> {
        let captures = self.source.regex().captures(stem(path)?)?;
        captures.get(1)?.as_str().parse().ok()
    }

    fn missing_ordinal(&self, path: &Path) -> SkipReason {
        match stem(path) {
            Some(stem) if self.source.regex().is_match(stem) => {
                SkipReason::OrdinalOutOfRange(path.to_path_buf())
            }
            _ => SkipReason::NoOrdinal(path.to_path_buf()),
        }
    }

    /// The single candidate with the winning ordinal
    pub fn best(&self, candidates: &[ImageId], images: &ImageStore) -> Result<ImageId, SkipReason> {
        let mut ranked = Vec::with_capacity(candidates.len());
        for id in candidates {
            let record = images.get(*id).ok_or(SkipReason::UnknownImage(*id))?;
            let ordinal = self
                .ordinal(&record.path)
                .ok_or_else(|| self.missing_ordinal(&record.path))?;
            ranked.push((*id, ordinal));
        }

        let best = match self.preference {
            OrdinalPreference::Lowest => ranked.iter().map(|(_, n)| *n).min(),
            OrdinalPreference::Highest => ranked.iter().map(|(_, n)| *n).max(),
        }
        .ok_or(SkipReason::EmptyGroup)?;

        let mut winners = ranked.iter().filter(|(_, n)| *n == best);
        match (winners.next(), winners.next()) {
            (Some((id, _)), None) => Ok(*id),
            _ => Err(SkipReason::OrdinalTie(best)),
        }
    }
}

fn stem(path: &Path) -> Option<&str> {
    path.file_stem()?.to_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(records: Vec<ImageRecord>) -> (ImageStore, Vec<ImageId>) {
        let mut store = ImageStore::new();
        let ids = records.into_iter().map(|r| store.intern(r)).collect();
        (store, ids)
    }

    fn sized(path: &str, size: u64, blockiness: f32) -> ImageRecord {
        ImageRecord {
            file_size: size,
            blockiness,
            ..ImageRecord::new(path)
        }
    }

    #[test]
    fn test_blockiness_tie_then_file_size() {
        let (store, ids) = store_with(vec![sized("A.jpg", 1000, 0.1), sized("B.jpg", 2000, 0.1)]);
        let selector =
            BestImageSelector::new(vec![BestRule::LowestBlockiness, BestRule::LargestFileSize]);
        assert_eq!(selector.get_best(&ids, &store), vec![ids[1]]);
    }

    #[test]
    fn test_disjoint_winners_yield_empty() {
        // a and b win on size, but blockiness over all three candidates picks c
        let (store, ids) = store_with(vec![
            sized("a.jpg", 2000, 0.5),
            sized("b.jpg", 2000, 0.4),
            sized("c.jpg", 100, 0.1),
        ]);
        let selector =
            BestImageSelector::new(vec![BestRule::LargestFileSize, BestRule::LowestBlockiness]);
        assert!(selector.get_best(&ids, &store).is_empty());
    }

    #[test]
    fn test_result_is_subset() {
        let (store, ids) = store_with(vec![
            sized("a.jpg", 5, 0.3),
            sized("b.jpg", 5, 0.3),
            sized("c.jpg", 1, 0.3),
        ]);
        let rule_sets = [
            vec![],
            vec![BestRule::SmallestFileSize],
            vec![BestRule::LargestFileSize, BestRule::LowestBlockiness],
            vec![BestRule::HighestResolution, BestRule::FewestJpegPeaks],
        ];
        for rules in rule_sets {
            let best = BestImageSelector::new(rules).get_best(&ids, &store);
            assert!(best.len() <= ids.len());
            assert!(best.iter().all(|id| ids.contains(id)));
        }
    }

    #[test]
    fn test_epsilon_tie() {
        let (store, ids) = store_with(vec![sized("a.jpg", 1, 0.1), sized("b.jpg", 2, 0.1001)]);
        let exact = BestImageSelector::new(vec![BestRule::LowestBlockiness]);
        assert_eq!(exact.get_best(&ids, &store), vec![ids[0]]);

        let loose = BestImageSelector::new(vec![BestRule::LowestBlockiness]).with_tie_epsilon(0.001);
        assert_eq!(loose.get_best(&ids, &store), ids);
    }

    #[test]
    fn test_ordinal_sources() {
        let before = PathRule::default();
        assert_eq!(before.ordinal(Path::new("/x/0012_holiday.jpg")), Some(12));
        assert_eq!(before.ordinal(Path::new("/x/holiday.jpg")), None);

        let after = PathRule {
            source: OrdinalSource::AfterLastUnderscore,
            preference: OrdinalPreference::Lowest,
        };
        assert_eq!(after.ordinal(Path::new("img_2_7.png")), Some(7));

        let trailing = PathRule {
            source: OrdinalSource::TrailingDigits,
            preference: OrdinalPreference::Highest,
        };
        assert_eq!(trailing.ordinal(Path::new("IMG1234.JPG")), Some(1234));
    }

    #[test]
    fn test_path_rule_best_and_skips() {
        let (store, ids) = store_with(vec![
            ImageRecord::new("/d/3_a.jpg"),
            ImageRecord::new("/d/1_b.jpg"),
            ImageRecord::new("/d/2_c.jpg"),
        ]);
        let rule = PathRule::default();
        assert_eq!(rule.best(&ids, &store), Ok(ids[1]));

        let (store, ids) = store_with(vec![ImageRecord::new("/d/1_a.jpg"), ImageRecord::new("/e/1_a.jpg")]);
        assert_eq!(rule.best(&ids, &store), Err(SkipReason::OrdinalTie(1)));

        let (store, ids) = store_with(vec![ImageRecord::new("/d/1_a.jpg"), ImageRecord::new("/d/b.jpg")]);
        assert_eq!(
            rule.best(&ids, &store),
            Err(SkipReason::NoOrdinal("/d/b.jpg".into()))
        );

        let huge = "/d/99999999999999999999999_a.jpg";
        let (store, ids) = store_with(vec![ImageRecord::new("/d/1_a.jpg"), ImageRecord::new(huge)]);
        assert_eq!(rule.ordinal(Path::new(huge)), None);
        assert_eq!(
            rule.best(&ids, &store),
            Err(SkipReason::OrdinalOutOfRange(huge.into()))
        );
    }
}
