// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Log Record
//!
//! A record is one timestamped message. It is stamped when the producer
//! submits it, never when it is flushed, so the timestamp reflects
//! submission time even if the batch sits in memory for a while.
//!
//! # Line Format
//! ```text
//! 2025-03-19 18:33:26: Message: 7
//! ```

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fmt;
use thiserror::Error;

/// strftime pattern for the timestamp prefix of every line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rendered width of [`TIMESTAMP_FORMAT`].
const TIMESTAMP_WIDTH: usize = 19;

/// Separator between the timestamp and the message.
const SEPARATOR: &str = ": ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordParseError {
    #[error("Line has no timestamp separator: {0:?}")]
    MissingSeparator(String),

    #[error("Invalid timestamp {0:?}")]
    InvalidTimestamp(String),
}

/// An immutable, timestamped log message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    timestamp: DateTime<Local>,
    message: String,
}

impl Record {
    /// Stamp `message` with the current local time.
    ///
    /// The message is written verbatim. A message containing `'\n'` spans
    /// several lines in the file, and only its first line parses back with
    /// [`Record::parse_line`].
    pub fn now(message: impl Into<String>) -> Self {
        Self::with_timestamp(Local::now(), message)
    }

    pub fn with_timestamp(timestamp: DateTime<Local>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Render the record as a single line, without the trailing newline.
    pub fn to_line(&self) -> String {
        self.to_string()
    }

    /// Parse a line produced by [`Record::to_line`].
    ///
    /// Sub-second precision is not stored in the file, so the parsed
    /// timestamp is truncated to whole seconds.
    pub fn parse_line(line: &str) -> Result<Self, RecordParseError> {
        let (ts, message) = line
            .get(..TIMESTAMP_WIDTH)
            .zip(line.get(TIMESTAMP_WIDTH..))
            .and_then(|(ts, rest)| Some((ts, rest.strip_prefix(SEPARATOR)?)))
            .ok_or_else(|| RecordParseError::MissingSeparator(line.to_string()))?;

        let naive = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT)
            .map_err(|_| RecordParseError::InvalidTimestamp(ts.to_string()))?;
        let timestamp = Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| RecordParseError::InvalidTimestamp(ts.to_string()))?;

        Ok(Self::with_timestamp(timestamp, message))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            SEPARATOR,
            self.message
        )
    }
}

/// Join a batch into one newline-terminated buffer, ready for a single write.
pub fn encode_batch(batch: &[Record]) -> String {
    let mut buf = String::with_capacity(batch.iter().map(|r| r.message.len() + 22).sum());
    for record in batch {
        buf.push_str(&record.to_line());
        buf.push('\n');
    }
    buf
}
