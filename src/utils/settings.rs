use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::error::{ProcessingError, Result};
use crate::models::PercentileLevels;
use crate::utils::constants::{
    DEFAULT_FLUSH_EVERY, DEFAULT_PERCENTILE_LEVELS, DEFAULT_SIMILAR_COUNT, DEFAULT_WINDOW_YEARS,
    ENV_PREFIX,
};

/// Tunables shared by the CLI commands.
///
/// Layered as: built-in defaults, then the optional TOML file, then
/// `STATION_SUMMARIZER_*` environment variables. Command-line flags are
/// applied on top by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub window_years: u32,
    pub flush_every: usize,
    pub max_workers: usize,
    pub percentile_levels: Vec<f64>,
    pub similar_count: usize,
}

impl Settings {
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("window_years", DEFAULT_WINDOW_YEARS as i64)?
            .set_default("flush_every", DEFAULT_FLUSH_EVERY as i64)?
            .set_default("max_workers", num_cpus::get() as i64)?
            .set_default("percentile_levels", DEFAULT_PERCENTILE_LEVELS.to_vec())?
            .set_default("similar_count", DEFAULT_SIMILAR_COUNT as i64)?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(false));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("percentile_levels"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn levels(&self) -> Result<PercentileLevels> {
        PercentileLevels::new(self.percentile_levels.clone())
    }

    fn validate(&self) -> Result<()> {
        if self.window_years == 0 {
            return Err(ProcessingError::Config(
                "window_years must be at least 1".to_string(),
            ));
        }
        if self.flush_every == 0 {
            return Err(ProcessingError::Config(
                "flush_every must be at least 1".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(ProcessingError::Config(
                "max_workers must be at least 1".to_string(),
            ));
        }
        self.levels()?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_years: DEFAULT_WINDOW_YEARS,
            flush_every: DEFAULT_FLUSH_EVERY,
            max_workers: num_cpus::get(),
            percentile_levels: DEFAULT_PERCENTILE_LEVELS.to_vec(),
            similar_count: DEFAULT_SIMILAR_COUNT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_file() -> Result<()> {
        let settings = Settings::load(None)?;
        assert_eq!(settings.window_years, DEFAULT_WINDOW_YEARS);
        assert_eq!(settings.flush_every, DEFAULT_FLUSH_EVERY);
        assert_eq!(settings.levels()?, PercentileLevels::default());
        Ok(())
    }

    #[test]
    fn test_missing_file_is_optional() -> Result<()> {
        let settings = Settings::load(Some(Path::new("does-not-exist.toml")))?;
        assert_eq!(settings.similar_count, DEFAULT_SIMILAR_COUNT);
        Ok(())
    }

    #[test]
    fn test_file_overrides_defaults() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "window_years = 10")?;
        writeln!(file, "flush_every = 50")?;
        writeln!(file, "percentile_levels = [0.0, 0.5, 1.0]")?;

        let settings = Settings::load(Some(file.path()))?;
        assert_eq!(settings.window_years, 10);
        assert_eq!(settings.flush_every, 50);
        assert_eq!(settings.levels()?.as_slice(), &[0.0, 0.5, 1.0]);
        Ok(())
    }

    #[test]
    fn test_invalid_levels_in_file_rejected() -> Result<()> {
        let mut file: NamedTempFile = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "percentile_levels = [0.1, 0.5]")?;

        assert!(Settings::load(Some(file.path())).is_err());
        Ok(())
    }
}
