/// Archive member suffix; each station's file is `<id>.csv`
pub const MEMBER_SUFFIX: &str = ".csv";

/// Column names in the per-station daily files
pub const DATE_COLUMN: &str = "DATE";
pub const TMIN_COLUMN: &str = "TMIN";
pub const TMAX_COLUMN: &str = "TMAX";

/// Percentile levels used when none are configured
pub const DEFAULT_PERCENTILE_LEVELS: [f64; 9] = [0.0, 0.025, 0.05, 0.1, 0.5, 0.9, 0.95, 0.975, 1.0];

/// Levels compared by the similarity ranker by default
pub const SIMILARITY_LOW_LEVEL: f64 = 0.1;
pub const SIMILARITY_HIGH_LEVEL: f64 = 0.9;

/// Processing defaults
pub const DEFAULT_WINDOW_YEARS: u32 = 3;
pub const DEFAULT_FLUSH_EVERY: usize = 1000;
pub const DEFAULT_SIMILAR_COUNT: usize = 20;
pub const PROGRESS_LOG_INTERVAL: u64 = 10_000;
pub const PROGRESS_REDRAW_INTERVAL: u64 = 500;

/// Upper bound on the buffer reserved from a member's declared size.
pub const MAX_PAYLOAD_PREALLOC: u64 = 64 << 20;

/// Checkpoint artifact format
pub const CHECKPOINT_SCHEMA_VERSION: u32 = 1;
pub const LOCK_SUFFIX: &str = "lock";

/// Default file locations
pub const DEFAULT_OUTPUT_FILE: &str = "output/good-stations-summary.json";
pub const DEFAULT_CONFIG_FILE: &str = "station-summarizer.toml";
pub const ENV_PREFIX: &str = "STATION_SUMMARIZER";

/// Relational sink schema version
pub const SQLITE_SCHEMA_VERSION: i64 = 1;

/// Mean Earth radius used for reported distances
pub const EARTH_RADIUS_KM: f64 = 6371.0;
