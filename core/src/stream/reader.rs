// # src/stream/reader.rs

//! First stage: pulls lines from a `LineSource` into the first queue.

use std::time::Instant;

use log::{debug, error, trace};
use serde::{Deserialize, Serialize};

use crate::stream::config::PipelineConfig;
use crate::stream::io::LineSource;
use crate::stream::message::{Message, SharedQueue};
use crate::stream::stage::StageReport;
use crate::telemetry::{Stage, StageTimes, TelemetryCounters};
use crate::types::StreamError;

/// Why the reader stopped producing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReaderExit {
    /// The sentinel text was read.
    Sentinel,
    /// The source ran dry without a sentinel.
    EndOfInput,
    /// `max_input_lines` data lines were forwarded.
    LineLimit,
}

/// True if `line` is `sentinel` followed by exactly one `\n` or `\r\n`.
///
/// The terminator is part of the sentinel: an unterminated final `STOP`
/// is ordinary data and gets forwarded.
pub fn is_sentinel(line: &str, sentinel: &str) -> bool {
    let Some(rest) = line.strip_suffix('\n') else {
        return false;
    };
    rest.strip_suffix('\r').unwrap_or(rest) == sentinel
}

pub struct Reader<S> {
    source: S,
    output: SharedQueue,
    sentinel: String,
    max_line_len: usize,
    max_input_lines: usize,
    forwarded: usize,
    counters: TelemetryCounters,
    times: StageTimes,
}

impl<S: LineSource> Reader<S> {
    pub fn new(source: S, output: SharedQueue, config: &PipelineConfig) -> Self {
        Self {
            source,
            output,
            sentinel: config.sentinel.clone(),
            max_line_len: config.max_line_len,
            max_input_lines: config.max_input_lines,
            forwarded: 0,
            counters: TelemetryCounters::default(),
            times: StageTimes::default(),
        }
    }

    /// Forward lines until a stop condition, then push end-of-stream.
    ///
    /// End-of-stream goes out exactly once on every exit path, errors
    /// included, so downstream stages never wait on a reader that is gone.
    /// The one exception is a closed queue: the run is already being torn
    /// down.
    pub fn run(&mut self) -> Result<ReaderExit, StreamError> {
        let outcome = self.pump();
        match &outcome {
            Err(e) if e.is_cancellation() => return outcome,
            Err(e) => error!("[READER] {e}; ending stream after {} lines", self.forwarded),
            Ok(exit) => debug!("[READER] stopping on {exit:?} after {} lines", self.forwarded),
        }

        if let Err(closed) = self.output.push(Message::EndOfStream) {
            if outcome.is_ok() {
                return Err(closed.into());
            }
        }
        outcome
    }

    fn pump(&mut self) -> Result<ReaderExit, StreamError> {
        loop {
            if self.forwarded >= self.max_input_lines {
                return Ok(ReaderExit::LineLimit);
            }

            let start = Instant::now();
            let next = self.source.next_line();
            self.times.add(Stage::Read, start.elapsed());

            let Some(line) = next? else {
                return Ok(ReaderExit::EndOfInput);
            };
            let line_no = self.forwarded + 1;

            if is_sentinel(&line, &self.sentinel) {
                return Ok(ReaderExit::Sentinel);
            }

            let len = line.chars().count();
            if len > self.max_line_len {
                return Err(StreamError::LineTooLong {
                    line_no,
                    len,
                    max: self.max_line_len,
                });
            }

            trace!("[READER] line {line_no}: {len} chars");
            self.counters.add_read(len);
            self.output.push(Message::Data(line))?;
            self.forwarded += 1;
        }
    }

    pub fn into_report(self, result: Result<ReaderExit, StreamError>) -> StageReport {
        let reader_exit = result.as_ref().ok().copied();
        let mut report = StageReport::new(Stage::Read, result.map(|_| ()), self.counters, self.times);
        report.reader_exit = reader_exit;
        report
    }
}
