use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};
use crate::utils::constants::DEFAULT_PERCENTILE_LEVELS;

/// The percentile fractions shared by every summary in one artifact.
///
/// Always sorted ascending, within `[0, 1]`, and containing both 0 and 1, so
/// the first and last summary values are the observed minimum and maximum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct PercentileLevels(Vec<f64>);

impl PercentileLevels {
    pub fn new(levels: Vec<f64>) -> Result<Self> {
        if levels.is_empty() {
            return Err(ProcessingError::InvalidPercentileLevels(
                "at least one level is required".to_string(),
            ));
        }

        if let Some(bad) = levels.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(ProcessingError::InvalidPercentileLevels(format!(
                "level {} is outside [0, 1]",
                bad
            )));
        }

        if levels.windows(2).any(|w| w[0] > w[1]) {
            return Err(ProcessingError::InvalidPercentileLevels(
                "levels must be sorted ascending".to_string(),
            ));
        }

        if levels[0] != 0.0 || levels[levels.len() - 1] != 1.0 {
            return Err(ProcessingError::InvalidPercentileLevels(
                "levels must include 0 and 1".to_string(),
            ));
        }

        Ok(Self(levels))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of an exact level, e.g. `0.1` for the 10th percentile.
    pub fn index_of(&self, level: f64) -> Option<usize> {
        self.0.iter().position(|&p| p == level)
    }
}

impl Default for PercentileLevels {
    fn default() -> Self {
        Self(DEFAULT_PERCENTILE_LEVELS.to_vec())
    }
}

impl TryFrom<Vec<f64>> for PercentileLevels {
    type Error = ProcessingError;

    fn try_from(levels: Vec<f64>) -> Result<Self> {
        Self::new(levels)
    }
}

impl From<PercentileLevels> for Vec<f64> {
    fn from(levels: PercentileLevels) -> Self {
        levels.0
    }
}

/// Percentile statistics for one station over its analysis window.
///
/// `low_values_c` and `high_values_c` are aligned with the artifact's
/// [`PercentileLevels`]. A `None` entry means the field had no present values
/// in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSummary {
    pub low_values_c: Vec<Option<f64>>,
    pub high_values_c: Vec<Option<f64>>,
    /// Present (min, max) values in the window.
    pub complete_days_count: (u32, u32),
    pub window_days: u32,
    pub degenerate: bool,
}

impl StationSummary {
    pub fn min_completeness(&self) -> f64 {
        Self::ratio(self.complete_days_count.0, self.window_days)
    }

    pub fn max_completeness(&self) -> f64 {
        Self::ratio(self.complete_days_count.1, self.window_days)
    }

    /// The worse of the two per-field completeness ratios.
    pub fn completeness(&self) -> f64 {
        self.min_completeness().min(self.max_completeness())
    }

    fn ratio(count: u32, window_days: u32) -> f64 {
        if window_days == 0 {
            0.0
        } else {
            count as f64 / window_days as f64
        }
    }
}
