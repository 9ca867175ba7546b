use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::warn;
use validator::Validate;

use crate::error::Result;
use crate::models::StationCatalogEntry;

/// Reads the pre-filtered station catalog, a JSON array of station entries.
pub struct CatalogReader;

impl CatalogReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_catalog(&self, path: &Path) -> Result<Vec<StationCatalogEntry>> {
        let file = File::open(path)?;
        let entries: Vec<StationCatalogEntry> = serde_json::from_reader(BufReader::new(file))?;
        self.check_entries(entries)
    }

    pub fn parse_catalog(&self, json: &str) -> Result<Vec<StationCatalogEntry>> {
        let entries: Vec<StationCatalogEntry> = serde_json::from_str(json)?;
        self.check_entries(entries)
    }

    /// Validate every entry and drop repeated ids, keeping the first.
    fn check_entries(&self, entries: Vec<StationCatalogEntry>) -> Result<Vec<StationCatalogEntry>> {
        let mut seen = HashSet::with_capacity(entries.len());
        let mut unique = Vec::with_capacity(entries.len());

        for entry in entries {
            entry.validate()?;
            if seen.insert(entry.id.clone()) {
                unique.push(entry);
            } else {
                warn!(station_id = %entry.id, "Duplicate station in catalog, keeping first");
            }
        }

        Ok(unique)
    }
}

impl Default for CatalogReader {
    fn default() -> Self {
        Self::new()
    }
}
