// ## src/telemetry/timers.rs

//! telemetry/timers.rs
//! Stage timers for the line pipeline.
//!
//! Summary: Records busy time (time spent outside queue waits) for the read,
//! normalize, collapse and write stages, plus wall-clock elapsed time.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Read,
    Normalize,
    Collapse,
    Write,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 4] = [Stage::Read, Stage::Normalize, Stage::Collapse, Stage::Write];

    /// Name given to the stage's OS thread.
    pub fn thread_name(self) -> &'static str {
        match self {
            Stage::Read => "linepipe-reader",
            Stage::Normalize => "linepipe-normalizer",
            Stage::Collapse => "linepipe-collapser",
            Stage::Write => "linepipe-writer",
        }
    }

    /// Log prefix.
    pub fn tag(self) -> &'static str {
        match self {
            Stage::Read => "READER",
            Stage::Normalize => "NORMALIZER",
            Stage::Collapse => "COLLAPSER",
            Stage::Write => "WRITER",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Read => "read",
            Stage::Normalize => "normalize",
            Stage::Collapse => "collapse",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimes {
    times: HashMap<Stage, Duration>,
}

impl StageTimes {
    /// Add duration to a stage (accumulates if already present).
    pub fn add(&mut self, stage: Stage, dur: Duration) {
        *self.times.entry(stage).or_insert(Duration::ZERO) += dur;
    }

    /// Get total duration for a stage.
    pub fn get(&self, stage: Stage) -> Duration {
        self.times.get(&stage).copied().unwrap_or(Duration::ZERO)
    }

    /// Get duration in milliseconds (f64).
    pub fn get_ms(&self, stage: Stage) -> f64 {
        self.get(stage).as_secs_f64() * 1_000.0
    }

    /// Sum all stage durations.
    pub fn total(&self) -> Duration {
        self.times.values().copied().sum()
    }

    pub fn merge(&mut self, other: &StageTimes) {
        for (stage, dur) in other.iter() {
            self.add(*stage, *dur);
        }
    }

    /// Check if all expected stages were measured.
    pub fn has_all(&self, expected: &[Stage]) -> bool {
        expected.iter().all(|s| self.times.contains_key(s))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Stage, &Duration)> {
        self.times.iter()
    }

    /// One-line human summary in pipeline order.
    pub fn summary(&self) -> String {
        Stage::ALL
            .iter()
            .map(|s| format!("{}={:.3}ms", s, self.get_ms(*s)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug)]
pub struct TelemetryTimer {
    pub start_time: Instant,
    pub end_time: Option<Instant>,
    pub stage_times: StageTimes,
}

impl Default for TelemetryTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryTimer {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            stage_times: StageTimes::default(),
        }
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    pub fn add_stage_time(&mut self, stage: Stage, dur: Duration) {
        self.stage_times.add(stage, dur);
    }

    pub fn elapsed(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => Instant::now().duration_since(self.start_time),
        }
    }
}
