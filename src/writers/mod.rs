#[cfg(feature = "sqlite")]
pub mod sqlite_writer;

#[cfg(feature = "sqlite")]
pub use sqlite_writer::SqliteSink;

use crate::error::Result;
use crate::models::{DailyObservation, StationCatalogEntry};

/// Receives each summarised station together with its in-window rows.
pub trait ObservationSink {
    fn record_station(
        &mut self,
        station: &StationCatalogEntry,
        observations: &[DailyObservation],
    ) -> Result<()>;
}
