
// ## `core.rs`: stable public API

use std::time::Duration;

use crate::stream::config::PipelineConfig;
use crate::stream::io::{open_input, open_output, InputSource, OutputSink};
use crate::stream::pipeline::Pipeline;
use crate::telemetry::TelemetrySnapshot;
use crate::types::StreamError;

#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    /// Whether to capture the output buffer in memory.
    /// Only honoured for `OutputSink::Memory`; the bytes are attached to
    /// the returned snapshot.
    pub capture_output: bool,

    /// Cancel the run if it has not finished within this long.
    /// `None` waits for end-of-stream however long it takes.
    pub timeout: Option<Duration>,
}

impl ApiConfig {
    pub fn new(capture_output: bool, timeout: Option<Duration>) -> Self {
        Self { capture_output, timeout }
    }

    pub fn with_capture() -> Self {
        Self {
            capture_output: true,
            timeout: None,
        }
    }
}

/// Run the four-stage pipeline from `input` to `output`.
pub fn run_stream(
    input: InputSource,
    output: OutputSink,
    config: PipelineConfig,
    api: ApiConfig,
) -> Result<TelemetrySnapshot, StreamError> {
    config.validate()?;

    let source = open_input(input, config.max_line_len)?;
    let (sink, maybe_buf) = open_output(output, api.capture_output)?;

    let pipeline = Pipeline::spawn(source, sink, &config)?;
    let mut snapshot = match api.timeout {
        Some(t) => pipeline.join_timeout(t)?,
        None => pipeline.join()?,
    };

    // --- Captured output for tests / embedding ---
    if let Some(buf) = maybe_buf {
        snapshot.attach_output(buf.lock().clone());
    }

    Ok(snapshot)
}
