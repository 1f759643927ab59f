use std::future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::FileError;
use crate::normalize::MessageNormalizer;
use crate::parser::LineParser;
use crate::store::AggregationStore;

/// Everything a worker needs to turn lines into counter updates
#[derive(Debug)]
pub struct IngestContext {
    parser: LineParser,
    normalizer: MessageNormalizer,
    store: AggregationStore,
}

impl IngestContext {
    pub fn new(parser: LineParser, normalizer: MessageNormalizer) -> Self {
        Self {
            parser,
            normalizer,
            store: AggregationStore::new(),
        }
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    /// Count one line, and its fields if it parses
    pub fn ingest_line(&self, line: &str) {
        self.store.record_line();

        match self.parser.parse(line) {
            Ok(record) => {
                let template = self.normalizer.normalize(record.message);
                self.store
                    .record_parsed(record.level, record.source, &template);
            }
            Err(miss) => trace!(%miss, "skipping line"),
        }
    }
}

/// How far a file got
#[derive(Debug)]
pub enum FileStatus {
    /// Read to end of file
    Complete,

    /// Some lines were counted before the failure
    Partial(FileError),

    /// Nothing was counted
    Failed(FileError),
}

/// Result of one unit of work
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub lines_read: u64,
    pub status: FileStatus,
}

impl FileOutcome {
    fn new(path: &Path, lines_read: u64, failure: Option<FileError>) -> Self {
        let status = match failure {
            None => FileStatus::Complete,
            Some(e) if lines_read == 0 => FileStatus::Failed(e),
            Some(e) => FileStatus::Partial(e),
        };
        Self {
            path: path.to_path_buf(),
            lines_read,
            status,
        }
    }

    /// Outcome for a file the pool never got to
    pub fn not_ingested(path: PathBuf) -> Self {
        Self {
            path,
            lines_read: 0,
            status: FileStatus::Failed(FileError::Cancelled),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.status, FileStatus::Complete)
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.status, FileStatus::Partial(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FileStatus::Failed(_))
    }

    pub fn error(&self) -> Option<&FileError> {
        match &self.status {
            FileStatus::Complete => None,
            FileStatus::Partial(e) | FileStatus::Failed(e) => Some(e),
        }
    }
}

/// Stream one file into the store, line by line in file order.
///
/// Never fails: open errors, read errors (including invalid UTF-8), the
/// per-file timeout and cancellation all end the file early and are
/// reported in the returned outcome.
pub async fn ingest_file(
    path: &Path,
    ctx: &IngestContext,
    file_timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> FileOutcome {
    debug!(path = %path.display(), "ingesting file");

    // Deadline runs from before the open
    let cancelled = cancel.cancelled();
    let expired = deadline(file_timeout.map(|t| Instant::now() + t));
    tokio::pin!(cancelled, expired);

    // `expired` only resolves when a timeout is configured
    let timed_out = || FileError::TimedOut(file_timeout.unwrap_or_default());

    let opened = tokio::select! {
        biased;

        _ = &mut cancelled => Err(FileError::Cancelled),
        _ = &mut expired => Err(timed_out()),
        opened = File::open(path) => opened.map_err(FileError::Open),
    };
    let file = match opened {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "log file not opened, skipping");
            return FileOutcome::new(path, 0, Some(e));
        }
    };

    let mut lines = BufReader::new(file).lines();
    let mut lines_read = 0u64;

    let failure = loop {
        let next = tokio::select! {
            biased;

            _ = &mut cancelled => break Some(FileError::Cancelled),
            _ = &mut expired => break Some(timed_out()),

            next = lines.next_line() => next,
        };

        match next {
            Ok(Some(line)) => {
                lines_read += 1;
                ctx.ingest_line(&line);
            }
            Ok(None) => break None,
            Err(source) => {
                break Some(FileError::Read {
                    line: lines_read,
                    source,
                });
            }
        }
    };

    match &failure {
        None => debug!(path = %path.display(), lines = lines_read, "file complete"),
        Some(e) => warn!(
            path = %path.display(),
            lines = lines_read,
            error = %e,
            "abandoned log file"
        ),
    }

    FileOutcome::new(path, lines_read, failure)
}

/// Resolves at `at`, or never
async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => time::sleep_until(at).await,
        None => future::pending().await,
    }
}
