use std::fmt;

use crate::error::{ProcessingError, Result};
use crate::models::{EnrichedStation, PercentileLevels, StationSummary};
use crate::utils::constants::{SIMILARITY_HIGH_LEVEL, SIMILARITY_LOW_LEVEL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Low,
    High,
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Series::Low => write!(f, "low"),
            Series::High => write!(f, "high"),
        }
    }
}

/// One percentile value of one series that takes part in the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonIndex {
    pub series: Series,
    pub index: usize,
}

impl ComparisonIndex {
    pub fn new(series: Series, index: usize) -> Self {
        Self { series, index }
    }

    fn value(&self, summary: &StationSummary) -> Option<f64> {
        let values = match self.series {
            Series::Low => &summary.low_values_c,
            Series::High => &summary.high_values_c,
        };
        values.get(self.index).copied().flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked<'a> {
    pub station: &'a EnrichedStation,
    /// Sum of squared differences in °C², or infinity when a compared
    /// value is missing on either side.
    pub distance: f64,
}

/// Orders stations by how closely their percentile values match a target.
///
/// No normalisation is applied, so the result is a heuristic ordering rather
/// than a calibrated climate distance. Rankings are not symmetric: B being
/// first for A says nothing about where A lands for B.
#[derive(Debug, Clone)]
pub struct SimilarityRanker {
    indices: Vec<ComparisonIndex>,
}

impl SimilarityRanker {
    /// Compare the 10th and 90th percentiles of both series.
    pub fn new(levels: &PercentileLevels) -> Result<Self> {
        let mut indices = Vec::with_capacity(4);
        for level in [SIMILARITY_LOW_LEVEL, SIMILARITY_HIGH_LEVEL] {
            let index = levels.index_of(level).ok_or_else(|| {
                ProcessingError::InvalidPercentileLevels(format!(
                    "similarity needs level {} in {:?}",
                    level,
                    levels.as_slice()
                ))
            })?;
            indices.push(ComparisonIndex::new(Series::Low, index));
            indices.push(ComparisonIndex::new(Series::High, index));
        }
        Ok(Self { indices })
    }

    pub fn with_indices(indices: Vec<ComparisonIndex>) -> Self {
        Self { indices }
    }

    pub fn indices(&self) -> &[ComparisonIndex] {
        &self.indices
    }

    pub fn distance(&self, a: &StationSummary, b: &StationSummary) -> f64 {
        self.indices
            .iter()
            .map(|idx| match (idx.value(a), idx.value(b)) {
                (Some(x), Some(y)) => (x - y).powi(2),
                _ => f64::INFINITY,
            })
            .sum()
    }

    /// Every candidate except the target, most similar first. Equal
    /// distances keep candidate order.
    pub fn rank<'a>(
        &self,
        target: &EnrichedStation,
        candidates: &'a [EnrichedStation],
    ) -> Vec<Ranked<'a>> {
        let mut ranked: Vec<Ranked<'a>> = candidates
            .iter()
            .filter(|c| c.id() != target.id())
            .map(|c| Ranked {
                station: c,
                distance: self.distance(&target.summary, &c.summary),
            })
            .collect();

        ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StationCatalogEntry;
    use pretty_assertions::assert_eq;

    fn station(id: &str, low: [Option<f64>; 9], high: [Option<f64>; 9]) -> EnrichedStation {
        EnrichedStation::new(
            StationCatalogEntry::new(id, 0.0, 0.0, 0.0, ""),
            StationSummary {
                low_values_c: low.to_vec(),
                high_values_c: high.to_vec(),
                complete_days_count: (1, 1),
                window_days: 1,
                degenerate: false,
            },
        )
    }

    fn flat(id: &str, low: f64, high: f64) -> EnrichedStation {
        station(id, [Some(low); 9], [Some(high); 9])
    }

    fn ids<'a>(ranked: &[Ranked<'a>]) -> Vec<&'a str> {
        ranked.iter().map(|r| r.station.id()).collect()
    }

    #[test]
    fn test_default_indices() {
        let ranker = SimilarityRanker::new(&PercentileLevels::default()).unwrap();
        assert_eq!(
            ranker.indices(),
            &[
                ComparisonIndex::new(Series::Low, 3),
                ComparisonIndex::new(Series::High, 3),
                ComparisonIndex::new(Series::Low, 5),
                ComparisonIndex::new(Series::High, 5),
            ]
        );
    }

    #[test]
    fn test_levels_without_deciles_are_rejected() {
        let levels = PercentileLevels::new(vec![0.0, 0.5, 1.0]).unwrap();
        assert!(matches!(
            SimilarityRanker::new(&levels),
            Err(ProcessingError::InvalidPercentileLevels(_))
        ));
    }

    #[test]
    fn test_rank_excludes_target_and_orders_by_distance() {
        let stations = vec![
            flat("T", 0.0, 20.0),
            flat("FAR", 10.0, 30.0),
            flat("NEAR", 1.0, 21.0),
            flat("MID", 3.0, 23.0),
        ];
        let ranker = SimilarityRanker::new(&PercentileLevels::default()).unwrap();

        let ranked = ranker.rank(&stations[0], &stations);
        assert_eq!(ids(&ranked), vec!["NEAR", "MID", "FAR"]);
        assert_eq!(ranked[0].distance, 4.0);
    }

    #[test]
    fn test_ties_keep_candidate_order() {
        let stations = vec![
            flat("T", 0.0, 0.0),
            flat("B", 1.0, 1.0),
            flat("A", -1.0, -1.0),
            flat("C", 1.0, -1.0),
        ];
        let ranker = SimilarityRanker::new(&PercentileLevels::default()).unwrap();
        assert_eq!(ids(&ranker.rank(&stations[0], &stations)), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_missing_values_rank_last() {
        let mut gappy_high = [Some(5.0); 9];
        gappy_high[5] = None;
        let stations = vec![
            flat("T", 0.0, 5.0),
            station("GAPPY", [Some(0.0); 9], gappy_high),
            flat("OFF", 9.0, 14.0),
        ];
        let ranker = SimilarityRanker::new(&PercentileLevels::default()).unwrap();

        let ranked = ranker.rank(&stations[0], &stations);
        assert_eq!(ids(&ranked), vec!["OFF", "GAPPY"]);
        assert!(ranked[1].distance.is_infinite());
    }

    #[test]
    fn test_custom_indices() {
        let stations = vec![flat("T", 0.0, 0.0), flat("X", 2.0, 100.0)];
        let ranker = SimilarityRanker::with_indices(vec![ComparisonIndex::new(Series::Low, 0)]);
        let ranked = ranker.rank(&stations[0], &stations);
        assert_eq!(ranked[0].distance, 4.0);
    }
}
