// ## src/telemetry/snapshot.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::stream::reader::ReaderExit;
use crate::stream::stage::StageExit;
use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{Stage, StageTimes, TelemetryTimer};

/// Core telemetry snapshot.
/// Captures counters, throughput, stage timings, and elapsed duration of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub counters: TelemetryCounters,
    pub throughput_chars_per_sec: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
    /// Why the reader stopped; `None` if it was cancelled or failed.
    pub reader_exit: Option<ReaderExit>,
    /// How each stage thread ended, in pipeline order.
    pub stage_exits: Vec<(Stage, StageExit)>,
    /// Sink contents, only when output capture was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<u8>>,
}

impl TelemetrySnapshot {
    pub fn from(
        counters: &TelemetryCounters,
        timer: &TelemetryTimer,
        reader_exit: Option<ReaderExit>,
    ) -> Self {
        let elapsed = timer.elapsed();

        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.chars_in as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            counters: counters.clone(),
            throughput_chars_per_sec: throughput,
            elapsed,
            stage_times: timer.stage_times.clone(),
            reader_exit,
            stage_exits: Vec::new(),
            output: None,
        }
    }

    pub fn attach_output(&mut self, buf: Vec<u8>) {
        self.output = Some(buf);
    }

    /// Captured output as text, lossily decoded.
    pub fn output_text(&self) -> Option<String> {
        self.output
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// True if all four stages reported and each ended on end-of-stream.
    pub fn all_stages_finished(&self) -> bool {
        self.stage_exits.len() == Stage::ALL.len()
            && self.stage_exits.iter().all(|(_, e)| *e == StageExit::Finished)
    }

    pub fn has_all_stages(&self) -> bool {
        self.stage_times.has_all(&Stage::ALL)
    }

    /// Validates internal invariants of a completed run:
    /// - every collapsed character was either written or dropped as residue
    /// - no single stage was busy longer than the whole run
    pub fn sanity_check(&self) -> bool {
        let c = &self.counters;
        let accounted = c.chars_out + c.residue_discarded;
        accounted == c.expected_chars_after_collapse()
            && Stage::ALL
                .iter()
                .all(|s| self.stage_times.get(*s) <= self.elapsed)
    }
}
