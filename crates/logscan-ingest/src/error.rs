use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Why a line produced no record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseMiss {
    #[error("line does not match `<timestamp> [<level>] <source> - <message>`")]
    Structural,

    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] TimestampError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("timestamp must end with the UTC designator `Z`")]
    MissingUtcDesignator,

    #[error("not an ISO-8601 instant")]
    Invalid(#[from] chrono::ParseError),
}

/// Per-file failure, recovered at the worker boundary
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("failed to open file")]
    Open(#[source] io::Error),

    #[error("read failed after {line} lines")]
    Read {
        line: u64,
        #[source]
        source: io::Error,
    },

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("cancelled")]
    Cancelled,
}

/// Run-level failure, fatal to the ingest phase
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("cannot read input root {path}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid ingest configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to compile pattern")]
    Pattern(#[from] regex::Error),
}
