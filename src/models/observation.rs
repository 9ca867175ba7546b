use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which temperature series a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureField {
    Minimum, // TMIN
    Maximum, // TMAX
}

impl TemperatureField {
    pub fn column_name(&self) -> &'static str {
        match self {
            TemperatureField::Minimum => "TMIN",
            TemperatureField::Maximum => "TMAX",
        }
    }
}

/// One row of a station's daily file. Temperatures are in tenths of a degree
/// Celsius; `None` means the field was absent or empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyObservation {
    pub date: NaiveDate,
    pub min_temperature_tenths_c: Option<i32>,
    pub max_temperature_tenths_c: Option<i32>,
}

impl DailyObservation {
    pub fn new(
        date: NaiveDate,
        min_temperature_tenths_c: Option<i32>,
        max_temperature_tenths_c: Option<i32>,
    ) -> Self {
        Self {
            date,
            min_temperature_tenths_c,
            max_temperature_tenths_c,
        }
    }

    pub fn value(&self, field: TemperatureField) -> Option<i32> {
        match field {
            TemperatureField::Minimum => self.min_temperature_tenths_c,
            TemperatureField::Maximum => self.max_temperature_tenths_c,
        }
    }

    pub fn has_any_temperature(&self) -> bool {
        self.min_temperature_tenths_c.is_some() || self.max_temperature_tenths_c.is_some()
    }
}
