use chrono::{Months, NaiveDate};
use std::collections::HashSet;

use crate::models::{DailyObservation, PercentileLevels, StationSummary, TemperatureField};

/// Nearest-rank index for fraction `p` over `n` sorted values.
///
/// `p = 0` selects the first element and `p = 1` the last; there is no
/// index when `n == 0`.
pub fn nearest_rank_index(p: f64, n: usize) -> Option<usize> {
    if n == 0 {
        return None;
    }
    let rank = (p * (n - 1) as f64).round();
    Some((rank.max(0.0) as usize).min(n - 1))
}

/// Select one value per level from an ascending slice.
pub fn quantiles(sorted: &[i32], levels: &[f64]) -> Vec<Option<i32>> {
    levels
        .iter()
        .map(|&p| nearest_rank_index(p, sorted.len()).map(|i| sorted[i]))
        .collect()
}

/// Reduces one station's observations to percentile statistics over a
/// trailing window of whole years ending at `now`.
#[derive(Debug, Clone)]
pub struct PercentileSummarizer {
    levels: PercentileLevels,
    window_years: u32,
}

impl PercentileSummarizer {
    pub fn new(levels: PercentileLevels, window_years: u32) -> Self {
        Self {
            levels,
            window_years,
        }
    }

    pub fn levels(&self) -> &PercentileLevels {
        &self.levels
    }

    pub fn window_years(&self) -> u32 {
        self.window_years
    }

    /// Exclusive lower bound of the window and its length in days.
    pub fn window(&self, now: NaiveDate) -> (NaiveDate, u32) {
        let cutoff = self
            .window_years
            .checked_mul(12)
            .and_then(|months| now.checked_sub_months(Months::new(months)))
            .unwrap_or(NaiveDate::MIN);
        let days = (now - cutoff).num_days().max(0) as u32;
        (cutoff, days)
    }

    /// Observations dated in `(cutoff, now]`, in file order, one per date.
    ///
    /// When a date repeats, the first row for it wins.
    pub fn window_observations(
        &self,
        observations: &[DailyObservation],
        now: NaiveDate,
    ) -> Vec<DailyObservation> {
        let (cutoff, _) = self.window(now);
        let mut seen = HashSet::new();

        observations
            .iter()
            .filter(|o| o.date > cutoff && o.date <= now)
            .filter(|o| seen.insert(o.date))
            .copied()
            .collect()
    }

    pub fn summarize(&self, observations: &[DailyObservation], now: NaiveDate) -> StationSummary {
        let (_, window_days) = self.window(now);
        let in_window = self.window_observations(observations, now);

        let lows = Self::sorted_values(&in_window, TemperatureField::Minimum);
        let highs = Self::sorted_values(&in_window, TemperatureField::Maximum);

        let to_celsius = |values: Vec<Option<i32>>| -> Vec<Option<f64>> {
            values
                .into_iter()
                .map(|v| v.map(|tenths| tenths as f64 / 10.0))
                .collect()
        };

        StationSummary {
            low_values_c: to_celsius(quantiles(&lows, self.levels.as_slice())),
            high_values_c: to_celsius(quantiles(&highs, self.levels.as_slice())),
            complete_days_count: (lows.len() as u32, highs.len() as u32),
            window_days,
            degenerate: lows.is_empty() || highs.is_empty(),
        }
    }

    fn sorted_values(observations: &[DailyObservation], field: TemperatureField) -> Vec<i32> {
        let mut values: Vec<i32> = observations.iter().filter_map(|o| o.value(field)).collect();
        values.sort_unstable();
        values
    }
}
