use std::io;

use thiserror::Error;

use crate::telemetry::Stage;

/// Unified stream error covering I/O, input validation, configuration and
/// stage failures.
/// - `From<io::Error>` enables `?` across the reader and writer stages.
/// - Messages aim to be stable and contextual for logs.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Input read failure or sink write failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An input line exceeded the configured maximum; it is never truncated.
    /// `len` is what was read before giving up, so it may undercount.
    #[error("line {line_no} exceeds {max} characters ({len} read)")]
    LineTooLong { line_no: usize, len: usize, max: usize },

    /// Invalid pipeline configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Push or pop on a queue closed by cancellation.
    #[error("queue closed")]
    QueueClosed,

    /// A stage thread panicked; carries the stage that died.
    #[error("{0} stage panicked")]
    StagePanicked(Stage),

    /// The run was torn down through a cancel handle.
    #[error("pipeline cancelled")]
    Cancelled,
}

impl StreamError {
    /// True for errors that only mean "someone else shut us down".
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StreamError::QueueClosed | StreamError::Cancelled)
    }
}
