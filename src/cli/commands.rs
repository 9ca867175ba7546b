use chrono::{Local, NaiveDate};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::analyzers::{summary_markdown, SimilarityRanker, SpatialIndex};
use crate::archive::{station_id_from_member, ArchiveExtractor};
use crate::cli::args::{
    Cli, Commands, DescribeArgs, NearestArgs, SimilarArgs, SummarizeArgs, ValidateArgs,
};
use crate::error::Result;
use crate::processors::{CheckpointedPipeline, PipelineOptions, PipelineReport, SummaryArtifact};
use crate::readers::{CatalogReader, RecordParser};
use crate::utils::progress::ProgressReporter;
use crate::utils::settings::Settings;
use crate::writers::ObservationSink;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let config_path = cli.config_path();
    let settings = Settings::load(Some(config_path.as_path()))?;
    debug!(?settings, "Loaded settings");

    match cli.command {
        Commands::Summarize(args) => summarize(args, &settings).await,
        Commands::Nearest(args) => nearest(args),
        Commands::Similar(args) => similar(args, &settings),
        Commands::Describe(args) => describe(args),
        Commands::Validate(args) => validate(args).await,
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    // A second subscriber (e.g. in tests) is not an error
    let _ = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    Ok(())
}

async fn summarize(args: SummarizeArgs, settings: &Settings) -> Result<()> {
    let catalog = CatalogReader::new().read_catalog(&args.catalog)?;
    let now = args.as_of.unwrap_or_else(today);
    let max_workers = args.max_workers.unwrap_or(settings.max_workers);

    let mut options = PipelineOptions::new(&args.archive, &args.output, now)
        .with_window_years(args.window_years.unwrap_or(settings.window_years))
        .with_levels(settings.levels()?)
        .with_flush_every(args.flush_every.unwrap_or(settings.flush_every))
        .with_max_workers(max_workers)
        .with_retry_skipped(args.retry_skipped);
    if let Some(batch_size) = args.batch_size {
        options = options.with_batch_size(batch_size);
    }

    info!(
        catalog = %args.catalog.display(),
        archive = %args.archive.display(),
        output = %args.output.display(),
        %now,
        window_years = options.window_years,
        workers = options.max_workers,
        retry_skipped = options.retry_skipped,
        "Summarizing stations"
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let signal_flag = Arc::clone(&cancel);
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current batch");
            signal_flag.store(true, Ordering::Relaxed);
        }
    });

    let pipeline = CheckpointedPipeline::new(options).with_cancel_flag(cancel);
    let quiet = args.quiet;
    let sink_path = sink_path(&args);

    let outcome = tokio::task::spawn_blocking(move || -> Result<PipelineReport> {
        let progress = ProgressReporter::new_spinner("Scanning archive...", quiet);
        let mut sink = open_sink(sink_path.as_deref())?;
        let report = pipeline.run_with_sink(&catalog, Some(&progress), sink.as_deref_mut());
        progress.finish_with_message("Archive scan finished");
        report
    })
    .await;
    signal_task.abort();

    let report = outcome??;
    println!("\n{}", report.summary());
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(feature = "sqlite")]
fn sink_path(args: &SummarizeArgs) -> Option<std::path::PathBuf> {
    args.sqlite.clone()
}

#[cfg(not(feature = "sqlite"))]
fn sink_path(_args: &SummarizeArgs) -> Option<std::path::PathBuf> {
    None
}

#[cfg(feature = "sqlite")]
fn open_sink(path: Option<&Path>) -> Result<Option<Box<dyn ObservationSink>>> {
    match path {
        Some(path) => {
            info!(database = %path.display(), "Storing daily rows");
            let sink = crate::writers::SqliteSink::open(path)?;
            Ok(Some(Box::new(sink)))
        }
        None => Ok(None),
    }
}

#[cfg(not(feature = "sqlite"))]
fn open_sink(_path: Option<&Path>) -> Result<Option<Box<dyn ObservationSink>>> {
    Ok(None)
}

fn nearest(args: NearestArgs) -> Result<()> {
    let artifact = SummaryArtifact::read(&args.summary)?;
    let index = SpatialIndex::new(artifact.stations);

    println!(
        "Stations nearest to ({:.4}, {:.4}) from {}:",
        args.lat,
        args.lon,
        args.summary.display()
    );
    for (i, neighbor) in index.nearest(args.lat, args.lon, args.k).iter().enumerate() {
        let station = neighbor.station;
        println!(
            "{:>3}. {} {:>8.1} km  {} ({:.1}% good data)",
            i + 1,
            station.id(),
            neighbor.distance_km,
            station.station.description,
            station.summary.completeness() * 100.0
        );
    }
    Ok(())
}

fn similar(args: SimilarArgs, settings: &Settings) -> Result<()> {
    let artifact = SummaryArtifact::read(&args.summary)?;
    let target = artifact.find(&args.station_id)?;
    let ranker = SimilarityRanker::new(&artifact.percentile_levels)?;
    let count = args.count.unwrap_or(settings.similar_count);

    println!("Stations most similar to {}:", target.id());
    for (i, ranked) in ranker
        .rank(target, &artifact.stations)
        .iter()
        .take(count)
        .enumerate()
    {
        println!(
            "{:>3}. {} {:>10.2}  {}",
            i + 1,
            ranked.station.id(),
            ranked.distance,
            ranked.station.station.description
        );
    }
    Ok(())
}

fn describe(args: DescribeArgs) -> Result<()> {
    let artifact = SummaryArtifact::read(&args.summary)?;
    let station = artifact.find(&args.station_id)?;
    println!("{}", summary_markdown(station, &artifact.percentile_levels));
    Ok(())
}

async fn validate(args: ValidateArgs) -> Result<()> {
    let catalog = CatalogReader::new().read_catalog(&args.catalog)?;
    println!(
        "Catalog {}: {} stations",
        args.catalog.display(),
        catalog.len()
    );

    let wanted: HashSet<String> = catalog.iter().map(|s| s.member_name()).collect();
    let archive = args.archive.clone();
    let total = wanted.len() as u64;

    let (found, failures, total_rows) = tokio::task::spawn_blocking(move || -> Result<_> {
        let progress = ProgressReporter::new(total, "Validating archive...", false);
        let parser = RecordParser::new();
        let mut found = HashSet::new();
        let mut failures = Vec::new();
        let mut total_rows = 0usize;

        ArchiveExtractor::new(&archive).for_each_member(&wanted, Some(&progress), |member| {
            let Some(station_id) = station_id_from_member(&member.name) else {
                return Ok(());
            };
            match parser.parse(station_id, &member.payload) {
                Ok(rows) => total_rows += rows.len(),
                Err(e) => failures.push(e.to_string()),
            }
            found.insert(station_id.to_string());
            Ok(())
        })?;

        progress.finish_with_message("Validation complete");
        Ok((found, failures, total_rows))
    })
    .await??;

    let missing: Vec<&str> = catalog
        .iter()
        .filter(|s| !found.contains(&s.id))
        .map(|s| s.id.as_str())
        .collect();

    println!("Station files found: {}", found.len());
    println!("Daily rows parsed: {}", total_rows);
    println!("Missing from archive: {}", missing.len());
    for id in missing.iter().take(10) {
        println!("  {}", id);
    }
    println!("Unparsable files: {}", failures.len());
    for failure in failures.iter().take(10) {
        println!("  {}", failure);
    }

    if missing.is_empty() && failures.is_empty() {
        println!("✅ Every catalog station has a readable file");
    } else {
        println!(
            "⚠️  Found {} missing and {} unparsable station files",
            missing.len(),
            failures.len()
        );
    }
    Ok(())
}
