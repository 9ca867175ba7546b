use rstar::primitives::GeomWithData;
use rstar::RTree;
use std::collections::HashMap;
use tracing::debug;

use crate::models::EnrichedStation;
use crate::utils::coordinates::{chord_squared_to_pseudo, pseudo_to_km, to_unit_vector};

type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// A station returned by a proximity query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    pub station: &'a EnrichedStation,
    pub distance_km: f64,
}

/// Great-circle nearest-neighbour lookup over summarised stations.
///
/// Stations are stored as points on the unit sphere, where Euclidean order
/// agrees with great-circle order. Ties are broken by input position.
pub struct SpatialIndex {
    stations: Vec<EnrichedStation>,
    by_id: HashMap<String, usize>,
    tree: RTree<IndexedPoint>,
}

impl SpatialIndex {
    pub fn new(stations: Vec<EnrichedStation>) -> Self {
        let points: Vec<IndexedPoint> = stations
            .iter()
            .enumerate()
            .map(|(i, s)| GeomWithData::new(to_unit_vector(s.latitude(), s.longitude()), i))
            .collect();

        let mut by_id = HashMap::with_capacity(stations.len());
        for (i, station) in stations.iter().enumerate() {
            by_id.entry(station.id().to_string()).or_insert(i);
        }

        debug!(stations = stations.len(), "Built spatial index");
        Self {
            stations,
            by_id,
            tree: RTree::bulk_load(points),
        }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn stations(&self) -> &[EnrichedStation] {
        &self.stations
    }

    pub fn get(&self, station_id: &str) -> Option<&EnrichedStation> {
        self.by_id.get(station_id).map(|&i| &self.stations[i])
    }

    /// Up to `k` stations closest to the point, nearest first.
    pub fn nearest(&self, lat: f64, lon: f64, k: usize) -> Vec<Neighbor<'_>> {
        if k == 0 {
            return Vec::new();
        }

        let query = to_unit_vector(lat, lon);
        let mut hits: Vec<(f64, usize)> = Vec::with_capacity(k);
        for (point, dist2) in self.tree.nearest_neighbor_iter_with_distance_2(&query) {
            // Keep pulling past k while the distance still ties the k-th hit
            if hits.len() >= k && hits[k - 1].0 < dist2 {
                break;
            }
            hits.push((dist2, point.data));
        }

        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        hits.truncate(k);

        hits.into_iter()
            .map(|(dist2, i)| Neighbor {
                station: &self.stations[i],
                distance_km: pseudo_to_km(chord_squared_to_pseudo(dist2)),
            })
            .collect()
    }

    pub fn closest(&self, lat: f64, lon: f64) -> Option<Neighbor<'_>> {
        self.nearest(lat, lon, 1).into_iter().next()
    }
}
