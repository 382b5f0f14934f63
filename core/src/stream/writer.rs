// # src/stream/writer.rs

//! Last stage: re-chunks the text stream into fixed-width records.

use std::io::Write;
use std::time::Instant;

use log::{debug, error, trace, warn};

use crate::constants::RECORD_TERMINATOR;
use crate::stream::cancel::{CancelHandle, CancelReason};
use crate::stream::config::{PipelineConfig, ResiduePolicy};
use crate::stream::message::{Message, SharedQueue};
use crate::stream::stage::StageReport;
use crate::telemetry::{Stage, StageTimes, TelemetryCounters};
use crate::types::StreamError;

/// Text waiting to be cut into records.
///
/// Holds a buffer and an emission cursor (a byte offset on a character
/// boundary); everything after the cursor is pending. The emitted prefix
/// is dropped before new text is appended, so the buffer never holds more
/// than one record's worth of residue plus the latest line.
#[derive(Debug, Clone)]
pub struct Accumulator {
    buf: String,
    cursor: usize,
    pending_chars: usize,
    width: usize,
}

impl Accumulator {
    pub fn new(width: usize) -> Self {
        assert!(width > 0, "record width must be non-zero");
        Self {
            buf: String::new(),
            cursor: 0,
            pending_chars: 0,
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn push_str(&mut self, text: &str) {
        self.compact();
        self.buf.push_str(text);
        self.pending_chars += text.chars().count();
    }

    /// Cut the next full-width record, if enough text is pending.
    pub fn next_record(&mut self) -> Option<&str> {
        if self.pending_chars < self.width {
            return None;
        }
        let start = self.cursor;
        let end = self.buf[start..]
            .char_indices()
            .nth(self.width)
            .map_or(self.buf.len(), |(i, _)| start + i);
        self.cursor = end;
        self.pending_chars -= self.width;
        self.check();
        Some(&self.buf[start..end])
    }

    /// Every full-width record currently available.
    pub fn drain_records(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(rec) = self.next_record() {
            out.push(rec.to_owned());
        }
        out
    }

    /// Take whatever is pending, even if shorter than a record.
    pub fn take_residue(&mut self) -> Option<String> {
        if self.pending_chars == 0 {
            return None;
        }
        let residue = self.buf[self.cursor..].to_owned();
        self.buf.clear();
        self.cursor = 0;
        self.pending_chars = 0;
        Some(residue)
    }

    pub fn pending(&self) -> &str {
        &self.buf[self.cursor..]
    }

    pub fn pending_chars(&self) -> usize {
        self.pending_chars
    }

    /// Bytes held, emitted prefix included.
    pub fn buffered_bytes(&self) -> usize {
        self.buf.len()
    }

    fn compact(&mut self) {
        if self.cursor > 0 {
            self.buf.drain(..self.cursor);
            self.cursor = 0;
        }
    }

    fn check(&self) {
        assert!(
            self.cursor <= self.buf.len() && self.buf.is_char_boundary(self.cursor),
            "accumulator cursor {} outside buffer of {} bytes",
            self.cursor,
            self.buf.len()
        );
    }
}

pub struct ChunkedWriter<W> {
    input: SharedQueue,
    sink: W,
    acc: Accumulator,
    residue: ResiduePolicy,
    cancel: CancelHandle,
    scratch: Vec<u8>,
    counters: TelemetryCounters,
    times: StageTimes,
}

impl<W: Write> ChunkedWriter<W> {
    pub fn new(input: SharedQueue, sink: W, config: &PipelineConfig, cancel: CancelHandle) -> Self {
        Self {
            input,
            sink,
            acc: Accumulator::new(config.record_width),
            residue: config.residue,
            cancel,
            scratch: Vec::with_capacity(config.record_width * 4 + 1),
            counters: TelemetryCounters::default(),
            times: StageTimes::default(),
        }
    }

    /// Consume lines until end-of-stream.
    ///
    /// A sink failure cancels the run: upstream stages may be blocked on a
    /// full queue that nobody will drain any more.
    pub fn run(&mut self) -> Result<(), StreamError> {
        let result = self.consume();
        if let Err(e) = &result {
            if !e.is_cancellation() {
                error!("[WRITER] {e}; cancelling pipeline");
                self.cancel.cancel_with(CancelReason::StageFailure(Stage::Write));
            }
        }
        result
    }

    fn consume(&mut self) -> Result<(), StreamError> {
        loop {
            match self.input.pop()? {
                Message::Data(line) => {
                    let start = Instant::now();
                    self.acc.push_str(&line);
                    self.emit_full_records()?;
                    self.times.add(Stage::Write, start.elapsed());
                }
                Message::EndOfStream => {
                    let start = Instant::now();
                    self.finish_residue()?;
                    self.sink.flush()?;
                    self.times.add(Stage::Write, start.elapsed());
                    debug!("[WRITER] end-of-stream, {} records written", self.counters.records_emitted);
                    return Ok(());
                }
            }
        }
    }

    fn emit_full_records(&mut self) -> Result<(), StreamError> {
        while let Some(rec) = self.acc.next_record() {
            write_record(&mut self.sink, &mut self.scratch, rec)?;
            self.counters.add_record(self.acc.width());
            trace!("[WRITER] record {}", self.counters.records_emitted);
        }
        Ok(())
    }

    fn finish_residue(&mut self) -> Result<(), StreamError> {
        let Some(residue) = self.acc.take_residue() else {
            return Ok(());
        };
        let chars = residue.chars().count();
        match self.residue {
            ResiduePolicy::Flush => {
                write_record(&mut self.sink, &mut self.scratch, &residue)?;
                self.counters.add_residue_flushed(chars);
                debug!("[WRITER] flushed {chars}-char final record");
            }
            ResiduePolicy::Discard => {
                self.counters.add_residue_discarded(chars);
                warn!("[WRITER] discarded {chars} trailing chars shorter than one record");
            }
        }
        Ok(())
    }

    pub fn into_report(self, result: Result<(), StreamError>) -> StageReport {
        StageReport::new(Stage::Write, result, self.counters, self.times)
    }
}

// Record and terminator go out in a single write_all.
fn write_record<W: Write>(sink: &mut W, scratch: &mut Vec<u8>, rec: &str) -> std::io::Result<()> {
    scratch.clear();
    scratch.extend_from_slice(rec.as_bytes());
    let mut term = [0u8; 4];
    scratch.extend_from_slice(RECORD_TERMINATOR.encode_utf8(&mut term).as_bytes());
    sink.write_all(scratch)
}
