// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use crate::record::RecordParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Invalid writer configuration: {0}")]
    InvalidConfig(String),

    /// `append` or `stop` called on a writer that has already been stopped.
    #[error("Writer has been stopped")]
    UseAfterStop,

    #[error("Async writer must be started inside a tokio runtime")]
    NoRuntime,

    #[error("Flush loop panicked")]
    FlushLoopPanicked,

    #[error("Flush loop task was cancelled before draining")]
    FlushLoopCancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed log line: {0}")]
    Parse(#[from] RecordParseError),
}

pub type Result<T> = std::result::Result<T, WriterError>;
