use chrono::{DateTime, Utc};
use regex::Regex;

use logscan_types::Record;

use crate::error::{ParseMiss, TimestampError};

/// `<timestamp> [<level>] <source> - <message>`
///
/// Exactly one whitespace character follows the dash; anything after it,
/// leading indentation included, belongs to the message.
const LINE_PATTERN: &str =
    r"^([0-9TZ:.\-]+)\s+\[([A-Za-z0-9_]+)\]\s+(\S+)\s+-\s(.*)$";

/// Parser for extracting records from raw log lines
#[derive(Clone, Debug)]
pub struct LineParser {
    pattern: Regex,
}

impl LineParser {
    /// Compile the line pattern
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(LINE_PATTERN)?,
        })
    }

    /// Parse one line into a record.
    ///
    /// Both the structural match and the strict timestamp parse must pass;
    /// either failure is a miss, never a panic.
    pub fn parse<'a>(&self, line: &'a str) -> Result<Record<'a>, ParseMiss> {
        let caps = self.pattern.captures(line).ok_or(ParseMiss::Structural)?;

        // All four groups are mandatory in the pattern
        let (Some(ts), Some(level), Some(source), Some(message)) =
            (caps.get(1), caps.get(2), caps.get(3), caps.get(4))
        else {
            return Err(ParseMiss::Structural);
        };

        let timestamp = parse_timestamp(ts.as_str()).map_err(ParseMiss::Timestamp)?;

        Ok(Record::new(
            timestamp,
            level.as_str(),
            source.as_str(),
            message.as_str(),
        ))
    }
}

/// Parse a strict ISO-8601 UTC instant such as `2025-10-22T12:34:56Z`
/// or `2025-10-22T12:34:56.123Z`.
///
/// Date, time with seconds and the `Z` designator are all required;
/// numeric offsets are rejected.
pub fn parse_timestamp(token: &str) -> Result<DateTime<Utc>, TimestampError> {
    if !token.ends_with('Z') {
        return Err(TimestampError::MissingUtcDesignator);
    }
    let parsed = DateTime::parse_from_rfc3339(token)?;
    Ok(parsed.with_timezone(&Utc))
}
