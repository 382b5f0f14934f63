// ### `src/telemetry/counters.rs`

//! telemetry/counters.rs
//! Mutable counters used during a pipeline run.
//!
//! Summary: Collects line, pair, record and character counts per stage.
//! Converted into an immutable TelemetrySnapshot at pipeline end.
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Deterministic counters collected during stream processing.
/// Character counts are Unicode scalar values, never bytes.
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub lines_read: u64,
    pub lines_normalized: u64,
    pub terminators_replaced: u64,
    pub lines_collapsed: u64,
    pub pairs_collapsed: u64,
    pub records_emitted: u64,
    pub chars_in: u64,
    pub chars_out: u64,
    pub residue_flushed: u64,
    pub residue_discarded: u64,
}

impl TelemetryCounters {
    /// Record one data line accepted by the reader.
    pub fn add_read(&mut self, chars: usize) {
        self.lines_read += 1;
        self.chars_in += chars as u64;
    }

    /// Record one line passed through the normalizer.
    /// - `replaced`: terminator characters rewritten to spaces
    pub fn add_normalized(&mut self, replaced: usize) {
        self.lines_normalized += 1;
        self.terminators_replaced += replaced as u64;
    }

    /// Record one line passed through the collapser.
    /// - `pairs`: marker pairs replaced in this line
    pub fn add_collapsed(&mut self, pairs: usize) {
        self.lines_collapsed += 1;
        self.pairs_collapsed += pairs as u64;
    }

    /// Record one full-width record written to the sink.
    pub fn add_record(&mut self, width: usize) {
        self.records_emitted += 1;
        self.chars_out += width as u64;
    }

    /// Record a short final record written on shutdown.
    pub fn add_residue_flushed(&mut self, chars: usize) {
        self.records_emitted += 1;
        self.chars_out += chars as u64;
        self.residue_flushed += chars as u64;
    }

    /// Record residue dropped on shutdown.
    pub fn add_residue_discarded(&mut self, chars: usize) {
        self.residue_discarded += chars as u64;
    }

    /// Characters that must reach the writer after collapsing:
    /// every collapsed pair shortens its line by exactly one.
    pub fn expected_chars_after_collapse(&self) -> u64 {
        self.chars_in.saturating_sub(self.pairs_collapsed)
    }

    // Per-stage counters are merged once at join time, so workers never
    // share a counter while running.
    pub fn merge(&mut self, other: &TelemetryCounters) {
        self.lines_read += other.lines_read;
        self.lines_normalized += other.lines_normalized;
        self.terminators_replaced += other.terminators_replaced;
        self.lines_collapsed += other.lines_collapsed;
        self.pairs_collapsed += other.pairs_collapsed;
        self.records_emitted += other.records_emitted;
        self.chars_in += other.chars_in;
        self.chars_out += other.chars_out;
        self.residue_flushed += other.residue_flushed;
        self.residue_discarded += other.residue_discarded;
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
