use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::{ProcessingError, Result};
use crate::models::DailyObservation;
use crate::utils::constants::{DATE_COLUMN, TMAX_COLUMN, TMIN_COLUMN};

/// Column positions resolved from a file's header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    date: usize,
    tmin: Option<usize>,
    tmax: Option<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord, station_id: &str) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let date = find(DATE_COLUMN).ok_or_else(|| {
            ProcessingError::record_parse(station_id, format!("no {} column in header", DATE_COLUMN))
        })?;

        Ok(Self {
            date,
            tmin: find(TMIN_COLUMN),
            tmax: find(TMAX_COLUMN),
        })
    }
}

/// Parses one station's daily CSV into observations, in file order.
///
/// Temperature columns are located by header name and may be absent. Any
/// malformed row rejects the whole file.
pub struct RecordParser {
    date_formats: Vec<&'static str>,
}

impl RecordParser {
    pub fn new() -> Self {
        Self {
            date_formats: vec!["%Y-%m-%d", "%Y%m%d"],
        }
    }

    pub fn parse(&self, station_id: &str, payload: &[u8]) -> Result<Vec<DailyObservation>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(Trim::All)
            .from_reader(payload);

        let headers = reader
            .headers()
            .map_err(|e| ProcessingError::record_parse(station_id, e.to_string()))?
            .clone();
        let layout = ColumnLayout::from_headers(&headers, station_id)?;

        let mut observations = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| ProcessingError::record_parse(station_id, e.to_string()))?;
            observations.push(self.parse_row(&record, &layout, station_id)?);
        }

        Ok(observations)
    }

    fn parse_row(
        &self,
        record: &StringRecord,
        layout: &ColumnLayout,
        station_id: &str,
    ) -> Result<DailyObservation> {
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let date_str = record.get(layout.date).unwrap_or_default();
        let date = self.parse_date(date_str).ok_or_else(|| {
            ProcessingError::record_parse(
                station_id,
                format!("line {}: invalid date '{}'", line, date_str),
            )
        })?;

        let min = self.parse_temperature(record, layout.tmin, line, station_id)?;
        let max = self.parse_temperature(record, layout.tmax, line, station_id)?;

        Ok(DailyObservation::new(date, min, max))
    }

    fn parse_date(&self, value: &str) -> Option<NaiveDate> {
        self.date_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
    }

    /// Empty fields are missing values, not zero.
    fn parse_temperature(
        &self,
        record: &StringRecord,
        column: Option<usize>,
        line: u64,
        station_id: &str,
    ) -> Result<Option<i32>> {
        let Some(value) = column.and_then(|c| record.get(c)) else {
            return Ok(None);
        };

        if value.is_empty() {
            return Ok(None);
        }

        value.parse::<i32>().map(Some).map_err(|_| {
            ProcessingError::record_parse(
                station_id,
                format!("line {}: invalid temperature '{}'", line, value),
            )
        })
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new()
    }
}
