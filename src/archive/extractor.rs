use flate2::read::GzDecoder;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, info};

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    MAX_PAYLOAD_PREALLOC, PROGRESS_LOG_INTERVAL, PROGRESS_REDRAW_INTERVAL,
};
use crate::utils::progress::ProgressReporter;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One requested archive member and its complete decompressed content.
#[derive(Debug)]
pub struct ExtractedMember {
    pub name: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub entries_scanned: u64,
    pub members_found: u64,
}

/// Single-pass reader that pulls selected members out of a `.tar` or
/// `.tar.gz` archive.
///
/// Entries are visited in stored order and only requested ones are buffered,
/// one at a time, so memory stays bounded by the largest requested member.
pub struct ArchiveExtractor {
    archive_path: PathBuf,
}

impl ArchiveExtractor {
    pub fn new(archive_path: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
        }
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Stream every requested member to `on_member` as soon as its content
    /// has been read.
    ///
    /// A requested name matches an entry's full path or its final path
    /// component. Names that never match are simply absent from the calls;
    /// diffing requested against found is the caller's job.
    pub fn for_each_member<F>(
        &self,
        wanted: &HashSet<String>,
        progress: Option<&ProgressReporter>,
        mut on_member: F,
    ) -> Result<ExtractionStats>
    where
        F: FnMut(ExtractedMember) -> Result<()>,
    {
        let mut stats = ExtractionStats::default();
        if wanted.is_empty() {
            return Ok(stats);
        }

        let mut remaining: HashSet<&str> = wanted.iter().map(String::as_str).collect();
        let mut archive = Archive::new(self.open_stream()?);
        let entries = archive.entries().map_err(|e| self.read_error(e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| self.read_error(e))?;
            stats.entries_scanned += 1;

            if stats.entries_scanned % PROGRESS_LOG_INTERVAL == 0 {
                info!(
                    entries_scanned = stats.entries_scanned,
                    members_found = stats.members_found,
                    "Scanning archive"
                );
            }
            if stats.entries_scanned % PROGRESS_REDRAW_INTERVAL == 0 {
                Self::report_progress(progress, &stats);
            }

            if !entry.header().entry_type().is_file() {
                continue;
            }

            let matched = {
                let path = entry.path().map_err(|e| self.read_error(e))?;
                let full = path.to_string_lossy();
                let base = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();

                if remaining.remove(full.as_ref()) {
                    Some(full.into_owned())
                } else if remaining.remove(base.as_str()) {
                    Some(base)
                } else {
                    None
                }
            };

            // Unmatched entries are skipped by the tar reader without buffering
            let Some(name) = matched else {
                continue;
            };

            let expected = entry.size();
            // The declared size comes from the archive and may be corrupt
            let mut payload = Vec::with_capacity(expected.min(MAX_PAYLOAD_PREALLOC) as usize);
            entry
                .read_to_end(&mut payload)
                .map_err(|e| self.read_error(e))?;
            if payload.len() as u64 != expected {
                return Err(self.read_error(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!(
                        "member {} truncated: expected {} bytes, read {}",
                        name,
                        expected,
                        payload.len()
                    ),
                )));
            }
            stats.members_found += 1;
            debug!(member = %name, bytes = payload.len(), "Extracted member");
            Self::report_progress(progress, &stats);

            on_member(ExtractedMember { name, payload })?;

            if remaining.is_empty() {
                debug!("All requested members found, stopping scan early");
                break;
            }
        }

        info!(
            entries_scanned = stats.entries_scanned,
            members_found = stats.members_found,
            requested = wanted.len(),
            "Archive scan complete"
        );

        Ok(stats)
    }

    /// Collect every requested member into memory, keyed by requested name.
    pub fn extract_all(&self, wanted: &HashSet<String>) -> Result<HashMap<String, Vec<u8>>> {
        let mut found = HashMap::with_capacity(wanted.len());
        self.for_each_member(wanted, None, |member| {
            found.insert(member.name, member.payload);
            Ok(())
        })?;
        Ok(found)
    }

    /// Open the archive as a byte stream, decompressing when it starts with
    /// the gzip magic number.
    fn open_stream(&self) -> Result<Box<dyn Read>> {
        let file = File::open(&self.archive_path).map_err(|e| self.read_error(e))?;
        let mut reader = BufReader::new(file);

        let is_gzip = {
            let head = reader.fill_buf().map_err(|e| self.read_error(e))?;
            head.starts_with(&GZIP_MAGIC)
        };

        if is_gzip {
            debug!(path = %self.archive_path.display(), "Opening gzip-compressed tar");
            Ok(Box::new(GzDecoder::new(reader)))
        } else {
            debug!(path = %self.archive_path.display(), "Opening plain tar");
            Ok(Box::new(reader))
        }
    }

    fn report_progress(progress: Option<&ProgressReporter>, stats: &ExtractionStats) {
        if let Some(p) = progress {
            p.update(stats.members_found);
            p.set_message(&format!(
                "Scanned {} entries, {} stations found",
                stats.entries_scanned, stats.members_found
            ));
        }
    }

    fn read_error(&self, source: std::io::Error) -> ProcessingError {
        ProcessingError::ArchiveRead {
            path: self.archive_path.clone(),
            source,
        }
    }
}
