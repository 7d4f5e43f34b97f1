//! Utility index: a weighted [0, 1] score ranking images inside a group.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::ImageStore;
use crate::types::{DuplicateGroup, ImageRecord};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilityWeights {
    pub resolution: f64,
    pub file_size: f64,
    pub blockiness: f64,
    pub bluring: f64,
    pub jpeg_peaks: f64,
}

impl Default for UtilityWeights {
    fn default() -> Self {
        Self {
            resolution: 4.0,
            file_size: 1.0,
            blockiness: 2.0,
            bluring: 2.0,
            jpeg_peaks: 1.0,
        }
    }
}

impl UtilityWeights {
    fn as_array(&self) -> [f64; 5] {
        [
            self.resolution,
            self.file_size,
            self.blockiness,
            self.bluring,
            self.jpeg_peaks,
        ]
    }

    pub fn validate(&self) -> Result<()> {
        let weights = self.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::Configuration(
                "Utility weights must be non-negative numbers".to_string(),
            ));
        }
        if weights.iter().sum::<f64>() == 0.0 {
            return Err(Error::Configuration(
                "At least one utility weight must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// (value, bigger is better)
fn metrics(record: &ImageRecord) -> [(f64, bool); 5] {
    [
        (record.resolution() as f64, true),
        (record.file_size as f64, true),
        (record.blockiness as f64, false),
        (record.bluring as f64, false),
        (record.jpeg_peaks as f64, false),
    ]
}

/// Recompute the utility index of every member of `group`
pub fn recalculate(group: &DuplicateGroup, images: &mut ImageStore, weights: &UtilityWeights) {
    let members: Vec<[(f64, bool); 5]> = group
        .files
        .iter()
        .filter_map(|id| images.get(*id).map(metrics))
        .collect();

    let mut maxima = [0.0f64; 5];
    for values in &members {
        for (slot, (value, _)) in maxima.iter_mut().zip(values) {
            *slot = f64::max(*slot, *value);
        }
    }

    let weights = weights.as_array();
    let total: f64 = weights.iter().sum();
    for id in &group.files {
        let Some(record) = images.get_mut(*id) else {
            continue;
        };
        let score: f64 = metrics(record)
            .iter()
            .zip(maxima)
            .zip(weights)
            .map(|(((value, bigger_is_better), max), weight)| {
                let normalized = if max <= 0.0 {
                    1.0
                } else if *bigger_is_better {
                    value / max
                } else {
                    1.0 - value / max
                };
                weight * normalized.clamp(0.0, 1.0)
            })
            .sum();
        record.utility_index = if total > 0.0 { score / total } else { 0.0 };
    }
}
