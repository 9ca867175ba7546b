use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::constants::{DEFAULT_CONFIG_FILE, DEFAULT_OUTPUT_FILE};

#[derive(Parser)]
#[command(name = "station-summarizer")]
#[command(about = "Summarize daily weather-station temperatures from a compressed archive")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Settings file (optional) [default: station-summarizer.toml]"
    )]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize every catalog station found in the archive, resuming from
    /// an existing output file
    Summarize(SummarizeArgs),

    /// List the stations closest to a point
    Nearest(NearestArgs),

    /// Rank stations by how closely their percentiles match a station
    Similar(SimilarArgs),

    /// Print one station's percentile table
    Describe(DescribeArgs),

    /// Check the catalog and the archive's station files without summarizing
    Validate(ValidateArgs),
}

#[derive(Args)]
pub struct SummarizeArgs {
    #[arg(short, long, help = "Station catalog JSON file")]
    pub catalog: PathBuf,

    #[arg(short, long, help = "Archive of per-station CSV files (.tar or .tar.gz)")]
    pub archive: PathBuf,

    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
    pub output: PathBuf,

    #[arg(long, help = "End of the analysis window, YYYY-MM-DD [default: today]")]
    pub as_of: Option<NaiveDate>,

    #[arg(long)]
    pub window_years: Option<u32>,

    #[arg(long, help = "Write the output after this many newly summarized stations")]
    pub flush_every: Option<usize>,

    #[arg(long)]
    pub max_workers: Option<usize>,

    #[arg(long, help = "Station files parsed per batch [default: max workers]")]
    pub batch_size: Option<usize>,

    #[arg(long, help = "Also retry stations an earlier run skipped as missing or unparsable")]
    pub retry_skipped: bool,

    #[arg(long, help = "Hide the progress spinner")]
    pub quiet: bool,

    #[cfg(feature = "sqlite")]
    #[arg(long, help = "Also store in-window daily rows in this SQLite database")]
    pub sqlite: Option<PathBuf>,
}

#[derive(Args)]
pub struct NearestArgs {
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE, help = "Summary file")]
    pub summary: PathBuf,

    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    #[arg(short, default_value = "5")]
    pub k: usize,
}

#[derive(Args)]
pub struct SimilarArgs {
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE, help = "Summary file")]
    pub summary: PathBuf,

    pub station_id: String,

    #[arg(short = 'n', long, help = "Number of stations to list [default: similar_count]")]
    pub count: Option<usize>,
}

#[derive(Args)]
pub struct DescribeArgs {
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE, help = "Summary file")]
    pub summary: PathBuf,

    pub station_id: String,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[arg(short, long, help = "Station catalog JSON file")]
    pub catalog: PathBuf,

    #[arg(short, long, help = "Archive of per-station CSV files (.tar or .tar.gz)")]
    pub archive: PathBuf,
}
