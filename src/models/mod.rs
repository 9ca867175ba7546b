pub mod observation;
pub mod station;
pub mod summary;

pub use observation::{DailyObservation, TemperatureField};
pub use station::{EnrichedStation, StationCatalogEntry};
pub use summary::{PercentileLevels, StationSummary};
