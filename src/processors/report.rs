use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub station_id: String,
    pub message: String,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub output_path: PathBuf,
    pub requested: usize,
    pub already_processed: usize,
    /// Stations skipped by an earlier run and left alone this time.
    pub previously_skipped: usize,
    pub processed: usize,
    pub entries_scanned: u64,
    /// Requested stations whose member never appeared in the archive.
    pub skipped_missing: Vec<String>,
    /// Stations with no present values for at least one field.
    pub degenerate: Vec<String>,
    pub parse_failures: Vec<ParseFailure>,
}

impl PipelineReport {
    /// True when nothing had to be extracted or parsed.
    pub fn is_noop(&self) -> bool {
        self.processed == 0
            && self.entries_scanned == 0
            && self.skipped_missing.is_empty()
            && self.parse_failures.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Station Summary Report ===\n");
        summary.push_str(&format!("Output: {}\n", self.output_path.display()));
        summary.push_str(&format!("Stations requested: {}\n", self.requested));
        summary.push_str(&format!(
            "Already processed (resumed): {}\n",
            self.already_processed
        ));
        if self.previously_skipped > 0 {
            summary.push_str(&format!(
                "Previously skipped (use --retry-skipped): {}\n",
                self.previously_skipped
            ));
        }
        summary.push_str(&format!("Processed this run: {}\n", self.processed));
        summary.push_str(&format!("Archive entries scanned: {}\n", self.entries_scanned));
        summary.push_str(&format!(
            "Skipped (missing from archive): {}\n",
            self.skipped_missing.len()
        ));
        summary.push_str(&format!(
            "Flagged degenerate: {}\n",
            self.degenerate.len()
        ));
        summary.push_str(&format!("Parse failures: {}\n", self.parse_failures.len()));

        if !self.parse_failures.is_empty() {
            summary.push_str("\nParse failures:\n");
            for (i, failure) in self.parse_failures.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. {}: {}\n",
                    i + 1,
                    failure.station_id,
                    failure.message
                ));
            }
            if self.parse_failures.len() > 10 {
                summary.push_str(&format!(
                    "  ... and {} more\n",
                    self.parse_failures.len() - 10
                ));
            }
        }

        if !self.skipped_missing.is_empty() {
            let shown: Vec<&str> = self
                .skipped_missing
                .iter()
                .take(10)
                .map(String::as_str)
                .collect();
            summary.push_str(&format!("\nMissing: {}", shown.join(", ")));
            if self.skipped_missing.len() > shown.len() {
                summary.push_str(&format!(
                    " ... and {} more",
                    self.skipped_missing.len() - shown.len()
                ));
            }
            summary.push('\n');
        }

        summary
    }
}
