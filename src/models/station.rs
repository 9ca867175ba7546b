use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::StationSummary;

/// Identity of a weather station as supplied by the input catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationCatalogEntry {
    #[serde(alias = "name")]
    #[validate(length(min = 1))]
    pub id: String,

    #[serde(alias = "lat")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[serde(alias = "lon")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[serde(alias = "elev")]
    pub elevation: f64,

    #[serde(alias = "desc", default)]
    pub description: String,
}

impl StationCatalogEntry {
    pub fn new(
        id: impl Into<String>,
        latitude: f64,
        longitude: f64,
        elevation: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            elevation,
            description: description.into(),
        }
    }

    /// Name of this station's daily file inside the archive.
    pub fn member_name(&self) -> String {
        format!("{}.csv", self.id)
    }
}

/// A catalog entry together with its computed summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedStation {
    #[serde(flatten)]
    pub station: StationCatalogEntry,
    pub summary: StationSummary,
}

impl EnrichedStation {
    pub fn new(station: StationCatalogEntry, summary: StationSummary) -> Self {
        Self { station, summary }
    }

    pub fn id(&self) -> &str {
        &self.station.id
    }

    pub fn latitude(&self) -> f64 {
        self.station.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.station.longitude
    }
}
