use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{ProcessingError, Result};
use crate::models::{EnrichedStation, PercentileLevels, StationCatalogEntry, StationSummary};
use crate::utils::constants::{CHECKPOINT_SCHEMA_VERSION, LOCK_SUFFIX};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    MissingFromArchive,
    ParseFailure,
}

/// A requested station that produced no summary. Not retried on resume
/// unless asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStation {
    pub id: String,
    pub reason: SkipReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SkippedStation {
    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: SkipReason::MissingFromArchive,
            message: None,
        }
    }

    pub fn parse_failure(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: SkipReason::ParseFailure,
            message: Some(message.into()),
        }
    }
}

/// Terminal artifact of a pipeline run, and the checkpoint it resumes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryArtifact {
    pub schema_version: u32,
    pub percentile_levels: PercentileLevels,
    pub stations: Vec<EnrichedStation>,
    #[serde(default)]
    pub skipped: Vec<SkippedStation>,
}

impl SummaryArtifact {
    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn find(&self, station_id: &str) -> Result<&EnrichedStation> {
        self.stations
            .iter()
            .find(|s| s.id() == station_id)
            .ok_or_else(|| ProcessingError::StationNotFound {
                station_id: station_id.to_string(),
            })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactRef<'a> {
    schema_version: u32,
    percentile_levels: &'a PercentileLevels,
    stations: Vec<&'a EnrichedStation>,
    skipped: Vec<&'a SkippedStation>,
}

/// Loose view used when resuming: a station without a `summary` is not done.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredArtifact {
    schema_version: u32,
    percentile_levels: PercentileLevels,
    stations: Vec<StoredStation>,
    #[serde(default)]
    skipped: Vec<SkippedStation>,
}

#[derive(Deserialize)]
struct StoredStation {
    #[serde(flatten)]
    station: StationCatalogEntry,
    #[serde(default)]
    summary: Option<StationSummary>,
}

/// Which stations are finished, plus their results, keyed by station id.
/// Stations that could not be summarised are kept apart in `skipped`.
///
/// Flushes replace the artifact atomically, so a reader never sees a
/// partially written file.
#[derive(Debug)]
pub struct CheckpointState {
    path: PathBuf,
    levels: PercentileLevels,
    processed: HashSet<String>,
    stations: BTreeMap<String, EnrichedStation>,
    skipped: BTreeMap<String, SkippedStation>,
}

impl CheckpointState {
    pub fn new(path: impl Into<PathBuf>, levels: PercentileLevels) -> Self {
        Self {
            path: path.into(),
            levels,
            processed: HashSet::new(),
            stations: BTreeMap::new(),
            skipped: BTreeMap::new(),
        }
    }

    /// Resume from the artifact at `path` if there is one.
    ///
    /// A different schema version or different percentile levels is fatal:
    /// summaries computed with other levels cannot be mixed into one file.
    pub fn load_or_new(path: impl Into<PathBuf>, levels: PercentileLevels) -> Result<Self> {
        let mut state = Self::new(path, levels);
        if !state.path.exists() {
            debug!(path = %state.path.display(), "No checkpoint found, starting fresh");
            return Ok(state);
        }

        let file = File::open(&state.path)?;
        let stored: StoredArtifact = serde_json::from_reader(BufReader::new(file))?;

        if stored.schema_version != CHECKPOINT_SCHEMA_VERSION {
            return Err(ProcessingError::Checkpoint(format!(
                "{} has schema version {}, expected {}",
                state.path.display(),
                stored.schema_version,
                CHECKPOINT_SCHEMA_VERSION
            )));
        }

        if stored.percentile_levels != state.levels {
            return Err(ProcessingError::Checkpoint(format!(
                "{} was built with percentile levels {:?}, current levels are {:?}",
                state.path.display(),
                stored.percentile_levels.as_slice(),
                state.levels.as_slice()
            )));
        }

        for stored_station in stored.stations {
            if let Some(summary) = stored_station.summary {
                if summary.low_values_c.len() != state.levels.len()
                    || summary.high_values_c.len() != state.levels.len()
                {
                    return Err(ProcessingError::Checkpoint(format!(
                        "station {} has a summary misaligned with the percentile levels",
                        stored_station.station.id
                    )));
                }
                state.record(EnrichedStation::new(stored_station.station, summary));
            }
        }

        for skipped in stored.skipped {
            state.record_skipped(skipped);
        }

        info!(
            path = %state.path.display(),
            processed = state.processed.len(),
            skipped = state.skipped.len(),
            "Resuming from checkpoint"
        );
        Ok(state)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn levels(&self) -> &PercentileLevels {
        &self.levels
    }

    pub fn is_processed(&self, station_id: &str) -> bool {
        self.processed.contains(station_id)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn record(&mut self, station: EnrichedStation) {
        self.skipped.remove(station.id());
        self.processed.insert(station.id().to_string());
        self.stations.insert(station.id().to_string(), station);
    }

    pub fn is_skipped(&self, station_id: &str) -> bool {
        self.skipped.contains_key(station_id)
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Ignored for a station that already has a summary.
    pub fn record_skipped(&mut self, skipped: SkippedStation) {
        if !self.processed.contains(&skipped.id) {
            self.skipped.insert(skipped.id.clone(), skipped);
        }
    }

    /// Skipped stations ordered by id.
    pub fn skipped(&self) -> impl Iterator<Item = &SkippedStation> {
        self.skipped.values()
    }

    /// Finished stations ordered by id.
    pub fn stations(&self) -> impl Iterator<Item = &EnrichedStation> {
        self.stations.values()
    }

    pub fn to_artifact(&self) -> SummaryArtifact {
        SummaryArtifact {
            schema_version: CHECKPOINT_SCHEMA_VERSION,
            percentile_levels: self.levels.clone(),
            stations: self.stations.values().cloned().collect(),
            skipped: self.skipped.values().cloned().collect(),
        }
    }

    /// Write the artifact to a temporary file beside the target, then rename
    /// it over the target.
    pub fn flush(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let artifact = ArtifactRef {
            schema_version: CHECKPOINT_SCHEMA_VERSION,
            percentile_levels: &self.levels,
            stations: self.stations.values().collect(),
            skipped: self.skipped.values().collect(),
        };

        let mut temp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &artifact)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| ProcessingError::Io(e.error))?;

        debug!(
            path = %self.path.display(),
            stations = self.stations.len(),
            "Checkpoint flushed"
        );
        Ok(())
    }
}

/// Exclusive claim on a checkpoint path for the lifetime of one run.
///
/// Backed by a `<artifact>.lock` file created with `create_new`; removed on
/// drop. A lock left behind by a killed process must be deleted by hand.
#[derive(Debug)]
pub struct CheckpointLock {
    lock_path: PathBuf,
}

impl CheckpointLock {
    pub fn acquire(artifact_path: &Path) -> Result<Self> {
        let lock_path = Self::lock_path_for(artifact_path);
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ProcessingError::CheckpointLocked(artifact_path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;

        Ok(Self { lock_path })
    }

    pub fn lock_path_for(artifact_path: &Path) -> PathBuf {
        let mut name: OsString = artifact_path.as_os_str().to_owned();
        name.push(".");
        name.push(LOCK_SUFFIX);
        PathBuf::from(name)
    }
}

impl Drop for CheckpointLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock_path) {
            warn!(path = %self.lock_path.display(), error = %e, "Failed to remove checkpoint lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn enriched(id: &str) -> EnrichedStation {
        EnrichedStation::new(
            StationCatalogEntry::new(id, 1.0, 2.0, 3.0, format!("{} desc", id)),
            StationSummary {
                low_values_c: vec![Some(-1.0), Some(2.5)],
                high_values_c: vec![Some(10.0), None],
                complete_days_count: (2, 1),
                window_days: 365,
                degenerate: false,
            },
        )
    }

    fn levels() -> PercentileLevels {
        PercentileLevels::new(vec![0.0, 1.0]).unwrap()
    }

    #[test]
    fn test_flush_then_resume() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("summary.json");

        let mut state = CheckpointState::new(&path, levels());
        state.record(enriched("B"));
        state.record(enriched("A"));
        state.flush()?;

        let resumed = CheckpointState::load_or_new(&path, levels())?;
        assert!(resumed.is_processed("A"));
        assert!(resumed.is_processed("B"));
        assert!(!resumed.is_processed("C"));

        let ids: Vec<&str> = resumed.stations().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(resumed.to_artifact(), state.to_artifact());
        Ok(())
    }

    #[test]
    fn test_skipped_stations_survive_resume() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("summary.json");

        let mut state = CheckpointState::new(&path, levels());
        state.record(enriched("A"));
        state.record_skipped(SkippedStation::missing("Z"));
        state.record_skipped(SkippedStation::parse_failure("M", "line 3: invalid date"));
        state.record_skipped(SkippedStation::missing("A"));
        state.flush()?;

        let mut resumed = CheckpointState::load_or_new(&path, levels())?;
        assert!(resumed.is_skipped("Z"));
        assert!(resumed.is_skipped("M"));
        assert!(!resumed.is_skipped("A"));
        assert!(!resumed.is_processed("Z"));

        let reasons: Vec<(&str, SkipReason)> =
            resumed.skipped().map(|s| (s.id.as_str(), s.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                ("M", SkipReason::ParseFailure),
                ("Z", SkipReason::MissingFromArchive)
            ]
        );

        // A later summary replaces the skip entry
        resumed.record(enriched("Z"));
        assert!(!resumed.is_skipped("Z"));
        assert_eq!(resumed.skipped_count(), 1);

        let artifact = SummaryArtifact::read(&path)?;
        assert_eq!(artifact.skipped.len(), 2);
        assert_eq!(artifact.skipped[0].message.as_deref(), Some("line 3: invalid date"));
        Ok(())
    }

    #[test]
    fn test_flush_leaves_no_temp_files() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("summary.json");

        let mut state = CheckpointState::new(&path, levels());
        state.record(enriched("A"));
        state.flush()?;
        state.flush()?;

        let names: Vec<_> = fs::read_dir(dir.path())?
            .map(|e| e.map(|e| e.file_name()))
            .collect::<std::io::Result<_>>()?;
        assert_eq!(names, vec![std::ffi::OsString::from("summary.json")]);
        Ok(())
    }

    #[test]
    fn test_station_without_summary_is_not_processed() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("summary.json");
        fs::write(
            &path,
            r#"{"schemaVersion":1,"percentileLevels":[0,1],"stations":[
                {"id":"A","latitude":0,"longitude":0,"elevation":0,"description":""}]}"#,
        )?;

        let state = CheckpointState::load_or_new(&path, levels())?;
        assert!(!state.is_processed("A"));
        assert_eq!(state.processed_count(), 0);
        Ok(())
    }

    #[test]
    fn test_level_mismatch_is_fatal() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("summary.json");
        CheckpointState::new(&path, levels()).flush()?;

        let result = CheckpointState::load_or_new(&path, PercentileLevels::default());
        assert!(matches!(result, Err(ProcessingError::Checkpoint(_))));
        Ok(())
    }

    #[test]
    fn test_schema_mismatch_is_fatal() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("summary.json");
        fs::write(&path, r#"{"schemaVersion":99,"percentileLevels":[0,1],"stations":[]}"#)?;

        let result = CheckpointState::load_or_new(&path, levels());
        assert!(matches!(result, Err(ProcessingError::Checkpoint(_))));
        Ok(())
    }

    #[test]
    fn test_lock_is_exclusive_and_released() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("summary.json");

        let lock = CheckpointLock::acquire(&path)?;
        assert!(matches!(
            CheckpointLock::acquire(&path),
            Err(ProcessingError::CheckpointLocked(_))
        ));
        drop(lock);

        assert!(!CheckpointLock::lock_path_for(&path).exists());
        assert!(CheckpointLock::acquire(&path).is_ok());
        Ok(())
    }
}
