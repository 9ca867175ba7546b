use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ProcessingError, Result};
use crate::models::{DailyObservation, StationCatalogEntry};
use crate::utils::constants::SQLITE_SCHEMA_VERSION;
use crate::writers::ObservationSink;

/// Relational copy of the in-window daily rows, one database per schema
/// version.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "Opened database");

        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let initialized: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_db_state'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        if initialized.is_none() {
            info!("Uninitialized database, creating schema");
            conn.execute_batch(include_str!("sqlite_schema.sql"))?;
            conn.execute(
                "INSERT INTO _db_state (schema_version) VALUES (?1)",
                params![SQLITE_SCHEMA_VERSION],
            )?;
        }

        Self::check_version(&conn)?;
        Ok(Self { conn })
    }

    fn check_version(conn: &Connection) -> Result<()> {
        let found: Option<i64> = conn
            .query_row("SELECT schema_version FROM _db_state", [], |row| row.get(0))
            .optional()?;

        match found {
            Some(version) if version == SQLITE_SCHEMA_VERSION => Ok(()),
            other => Err(ProcessingError::SchemaVersionMismatch {
                expected: SQLITE_SCHEMA_VERSION,
                found: other.unwrap_or(0),
            }),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn station_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM station", [], |row| row.get(0))?)
    }

    pub fn daily_count(&self, station_id: &str) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM daily WHERE id = ?1",
            params![station_id],
            |row| row.get(0),
        )?)
    }
}

impl ObservationSink for SqliteSink {
    fn record_station(
        &mut self,
        station: &StationCatalogEntry,
        observations: &[DailyObservation],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"INSERT OR IGNORE INTO station (id, lat, lon, elev, "desc")
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                station.id,
                station.latitude,
                station.longitude,
                station.elevation,
                station.description
            ],
        )?;

        let mut inserted = 0usize;
        {
            let mut insert_row = tx.prepare(
                "INSERT OR IGNORE INTO daily (id, yyyymmdd, tmax, tmin) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for obs in observations.iter().filter(|o| o.has_any_temperature()) {
                let tmax = obs.max_temperature_tenths_c.map(|t| t as f64 / 10.0);
                let tmin = obs.min_temperature_tenths_c.map(|t| t as f64 / 10.0);
                inserted += insert_row.execute(params![
                    station.id,
                    obs.date.format("%Y-%m-%d").to_string(),
                    tmax,
                    tmin
                ])?;
            }
        }
        tx.commit()?;

        debug!(station_id = %station.id, rows = inserted, "Stored daily rows");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn obs(day: u32, tmin: Option<i32>, tmax: Option<i32>) -> DailyObservation {
        DailyObservation::new(NaiveDate::from_ymd_opt(2023, 3, day).unwrap(), tmin, tmax)
    }

    #[test]
    fn test_rows_without_values_are_skipped() -> Result<()> {
        let mut sink = SqliteSink::open_in_memory()?;
        let station = StationCatalogEntry::new("S1", 1.0, 2.0, 3.0, "first");

        sink.record_station(
            &station,
            &[obs(1, Some(-15), Some(120)), obs(2, None, None), obs(3, None, Some(80))],
        )?;

        assert_eq!(sink.station_count()?, 1);
        assert_eq!(sink.daily_count("S1")?, 2);

        let tmin: Option<f64> = sink.connection().query_row(
            "SELECT tmin FROM daily WHERE id = 'S1' AND yyyymmdd = '2023-03-01'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(tmin, Some(-1.5));
        Ok(())
    }

    #[test]
    fn test_reinsert_is_ignored() -> Result<()> {
        let mut sink = SqliteSink::open_in_memory()?;
        let station = StationCatalogEntry::new("S1", 1.0, 2.0, 3.0, "first");
        let rows = [obs(1, Some(1), Some(2)), obs(2, Some(3), Some(4))];

        sink.record_station(&station, &rows)?;
        sink.record_station(&station, &rows)?;

        assert_eq!(sink.station_count()?, 1);
        assert_eq!(sink.daily_count("S1")?, 2);
        Ok(())
    }

    #[test]
    fn test_reopen_and_version_mismatch() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("daily.db");

        {
            let mut sink = SqliteSink::open(&path)?;
            sink.record_station(&StationCatalogEntry::new("S1", 0.0, 0.0, 0.0, ""), &[])?;
        }
        assert_eq!(SqliteSink::open(&path)?.station_count()?, 1);

        Connection::open(&path)?.execute("UPDATE _db_state SET schema_version = 7", [])?;
        let result = SqliteSink::open(&path);
        assert!(matches!(
            result,
            Err(ProcessingError::SchemaVersionMismatch { expected: 1, found: 7 })
        ));
        Ok(())
    }
}
