use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveExtractor, ExtractedMember};
use crate::error::{ProcessingError, Result};
use crate::models::{DailyObservation, EnrichedStation, PercentileLevels, StationCatalogEntry};
use crate::processors::checkpoint::{CheckpointLock, CheckpointState, SkippedStation};
use crate::processors::report::{ParseFailure, PipelineReport};
use crate::processors::summarizer::PercentileSummarizer;
use crate::readers::RecordParser;
use crate::utils::constants::{DEFAULT_FLUSH_EVERY, DEFAULT_WINDOW_YEARS};
use crate::utils::progress::ProgressReporter;
use crate::writers::ObservationSink;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub archive_path: PathBuf,
    pub output_path: PathBuf,
    pub now: NaiveDate,
    pub window_years: u32,
    pub levels: PercentileLevels,
    pub flush_every: usize,
    pub max_workers: usize,
    pub batch_size: usize,
    /// Also attempt stations an earlier run recorded as skipped.
    pub retry_skipped: bool,
}

impl PipelineOptions {
    pub fn new(archive_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>, now: NaiveDate) -> Self {
        let max_workers = num_cpus::get();
        Self {
            archive_path: archive_path.into(),
            output_path: output_path.into(),
            now,
            window_years: DEFAULT_WINDOW_YEARS,
            levels: PercentileLevels::default(),
            flush_every: DEFAULT_FLUSH_EVERY,
            max_workers,
            batch_size: max_workers,
            retry_skipped: false,
        }
    }

    pub fn with_window_years(mut self, window_years: u32) -> Self {
        self.window_years = window_years;
        self
    }

    pub fn with_levels(mut self, levels: PercentileLevels) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_flush_every(mut self, flush_every: usize) -> Self {
        self.flush_every = flush_every.max(1);
        self
    }

    /// Also resets the batch size to one payload per worker.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self.batch_size = self.max_workers;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_retry_skipped(mut self, retry_skipped: bool) -> Self {
        self.retry_skipped = retry_skipped;
        self
    }
}

enum StationOutcome {
    Summarized {
        station: EnrichedStation,
        window_rows: Option<Vec<DailyObservation>>,
    },
    Failed(ParseFailure),
}

/// Extract, parse and summarise every catalog station that the checkpoint
/// does not already cover. Stations recorded as skipped by an earlier run
/// are left out unless `retry_skipped` is set.
///
/// Extraction runs on the calling thread in archive order. Parsing and
/// summarising fan out over a bounded rayon pool one batch at a time, and
/// each batch's raw payloads are dropped before the next batch is read.
pub struct CheckpointedPipeline {
    options: PipelineOptions,
    parser: RecordParser,
    summarizer: PercentileSummarizer,
    cancel: Option<Arc<AtomicBool>>,
}

impl CheckpointedPipeline {
    pub fn new(options: PipelineOptions) -> Self {
        let summarizer = PercentileSummarizer::new(options.levels.clone(), options.window_years);
        Self {
            options,
            parser: RecordParser::new(),
            summarizer,
            cancel: None,
        }
    }

    /// Stop cleanly, after flushing, once `flag` becomes true.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn run(
        &self,
        catalog: &[StationCatalogEntry],
        progress: Option<&ProgressReporter>,
    ) -> Result<PipelineReport> {
        self.run_with_sink(catalog, progress, None)
    }

    pub fn run_with_sink(
        &self,
        catalog: &[StationCatalogEntry],
        progress: Option<&ProgressReporter>,
        mut sink: Option<&mut (dyn ObservationSink + '_)>,
    ) -> Result<PipelineReport> {
        let _lock = CheckpointLock::acquire(&self.options.output_path)?;
        let mut state =
            CheckpointState::load_or_new(&self.options.output_path, self.options.levels.clone())?;

        let mut report = PipelineReport {
            output_path: self.options.output_path.clone(),
            ..Default::default()
        };

        // Member name -> catalog entry, for every station still to do
        let mut work: HashMap<String, &StationCatalogEntry> = HashMap::new();
        let mut seen = HashSet::new();
        for entry in catalog {
            if !seen.insert(entry.id.as_str()) {
                continue;
            }
            report.requested += 1;
            if state.is_processed(&entry.id) {
                report.already_processed += 1;
            } else if state.is_skipped(&entry.id) && !self.options.retry_skipped {
                report.previously_skipped += 1;
            } else {
                work.insert(entry.member_name(), entry);
            }
        }

        info!(
            requested = report.requested,
            already_processed = report.already_processed,
            previously_skipped = report.previously_skipped,
            to_process = work.len(),
            "Starting station summarization"
        );
        if let (Some(p), true) = (progress, report.already_processed > 0) {
            p.println(&format!(
                "Resuming: {} of {} stations already summarized",
                report.already_processed, report.requested
            ));
        }

        if work.is_empty() {
            if !state.path().exists() {
                state.flush()?;
            }
            return Ok(report);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let wanted: HashSet<String> = work.keys().cloned().collect();
        let mut found: HashSet<String> = HashSet::with_capacity(work.len());
        let mut batch: Vec<(&StationCatalogEntry, ExtractedMember)> =
            Vec::with_capacity(self.options.batch_size);
        let mut since_flush = 0usize;
        let want_rows = sink.is_some();

        let extractor = ArchiveExtractor::new(&self.options.archive_path);
        let stats = extractor.for_each_member(&wanted, progress, |member| {
            let Some(&entry) = work.get(&member.name) else {
                return Ok(());
            };
            found.insert(member.name.clone());
            batch.push((entry, member));

            if batch.len() >= self.options.batch_size {
                let outcomes = self.process_batch(&pool, std::mem::take(&mut batch), want_rows);
                self.absorb(
                    outcomes,
                    &mut state,
                    &mut report,
                    &mut since_flush,
                    &mut sink,
                )?;
                self.check_cancelled(&state)?;
            }
            Ok(())
        })?;

        if !batch.is_empty() {
            let outcomes = self.process_batch(&pool, std::mem::take(&mut batch), want_rows);
            self.absorb(
                outcomes,
                &mut state,
                &mut report,
                &mut since_flush,
                &mut sink,
            )?;
        }

        report.entries_scanned = stats.entries_scanned;
        report.skipped_missing = work
            .iter()
            .filter(|(name, _)| !found.contains(*name))
            .map(|(_, entry)| entry.id.clone())
            .collect();
        report.skipped_missing.sort();

        for id in &report.skipped_missing {
            warn!(station_id = %id, "Station file missing from archive, skipped");
            state.record_skipped(SkippedStation::missing(id.as_str()));
        }

        state.flush()?;

        info!(
            processed = report.processed,
            skipped_missing = report.skipped_missing.len(),
            degenerate = report.degenerate.len(),
            parse_failures = report.parse_failures.len(),
            "Station summarization complete"
        );

        Ok(report)
    }

    /// Parse and summarise one batch in parallel. Each payload is released as
    /// soon as it has been parsed.
    fn process_batch(
        &self,
        pool: &rayon::ThreadPool,
        batch: Vec<(&StationCatalogEntry, ExtractedMember)>,
        want_rows: bool,
    ) -> Vec<StationOutcome> {
        pool.install(|| {
            batch
                .into_par_iter()
                .map(|(entry, member)| self.process_member(entry, member, want_rows))
                .collect()
        })
    }

    fn process_member(
        &self,
        entry: &StationCatalogEntry,
        member: ExtractedMember,
        want_rows: bool,
    ) -> StationOutcome {
        let parsed = self.parser.parse(&entry.id, &member.payload);
        drop(member);

        match parsed {
            Ok(observations) => {
                let now = self.options.now;
                let summary = self.summarizer.summarize(&observations, now);
                let window_rows =
                    want_rows.then(|| self.summarizer.window_observations(&observations, now));
                StationOutcome::Summarized {
                    station: EnrichedStation::new(entry.clone(), summary),
                    window_rows,
                }
            }
            Err(e) => StationOutcome::Failed(ParseFailure {
                station_id: entry.id.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// Fold results into the checkpoint in extraction order, flushing every
    /// `flush_every` completed stations.
    fn absorb(
        &self,
        outcomes: Vec<StationOutcome>,
        state: &mut CheckpointState,
        report: &mut PipelineReport,
        since_flush: &mut usize,
        sink: &mut Option<&mut (dyn ObservationSink + '_)>,
    ) -> Result<()> {
        for outcome in outcomes {
            match outcome {
                StationOutcome::Summarized {
                    station,
                    window_rows,
                } => {
                    if let (Some(sink), Some(rows)) = (sink.as_mut(), window_rows.as_deref()) {
                        sink.record_station(&station.station, rows)?;
                    }
                    if station.summary.degenerate {
                        debug!(station_id = %station.id(), "Degenerate summary");
                        report.degenerate.push(station.id().to_string());
                    }
                    state.record(station);
                    report.processed += 1;
                    *since_flush += 1;

                    if *since_flush >= self.options.flush_every {
                        state.flush()?;
                        *since_flush = 0;
                        info!(processed = state.processed_count(), "Checkpoint written");
                    }
                }
                StationOutcome::Failed(failure) => {
                    warn!(
                        station_id = %failure.station_id,
                        error = %failure.message,
                        "Skipping station with unparsable file"
                    );
                    state.record_skipped(SkippedStation::parse_failure(
                        failure.station_id.as_str(),
                        failure.message.as_str(),
                    ));
                    report.parse_failures.push(failure);
                }
            }
        }
        Ok(())
    }

    fn check_cancelled(&self, state: &CheckpointState) -> Result<()> {
        let cancelled = self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed));
        if cancelled {
            warn!("Cancellation requested, writing checkpoint before stopping");
            state.flush()?;
            return Err(ProcessingError::Cancelled);
        }
        Ok(())
    }
}
