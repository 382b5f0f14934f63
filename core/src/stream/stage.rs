//! Shared shape of a pipeline stage: how it reports back, and the pop →
//! transform → push loop used by the two middle stages.

use std::time::Instant;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::stream::message::{Message, SharedQueue};
use crate::stream::reader::ReaderExit;
use crate::telemetry::{Stage, StageTimes, TelemetryCounters};
use crate::types::StreamError;

/// How a stage thread ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageExit {
    /// Saw end-of-stream (or, for the reader, emitted it).
    Finished,
    /// A queue it used was closed under it.
    Cancelled,
    /// Returned an error of its own.
    Failed,
}

/// What a stage thread sends back to the coordinator before exiting.
#[derive(Debug)]
pub struct StageReport {
    pub stage: Stage,
    pub exit: StageExit,
    pub error: Option<StreamError>,
    pub counters: TelemetryCounters,
    pub times: StageTimes,
    pub reader_exit: Option<ReaderExit>,
}

impl StageReport {
    pub fn new(
        stage: Stage,
        result: Result<(), StreamError>,
        counters: TelemetryCounters,
        times: StageTimes,
    ) -> Self {
        let (exit, error) = match result {
            Ok(()) => (StageExit::Finished, None),
            Err(e) if e.is_cancellation() => (StageExit::Cancelled, None),
            Err(e) => (StageExit::Failed, Some(e)),
        };
        Self {
            stage,
            exit,
            error,
            counters,
            times,
            reader_exit: None,
        }
    }
}

/// Per-line rewrite performed by a middle stage. Must not fail.
pub trait LineTransform: Send {
    const STAGE: Stage;

    fn apply(&mut self, line: String, counters: &mut TelemetryCounters) -> String;
}

/// Middle stage: pops from `input`, rewrites data lines, pushes to `output`,
/// forwards end-of-stream once and stops.
pub struct TransformStage<T> {
    transform: T,
    input: SharedQueue,
    output: SharedQueue,
    counters: TelemetryCounters,
    times: StageTimes,
}

impl<T: LineTransform> TransformStage<T> {
    pub fn new(transform: T, input: SharedQueue, output: SharedQueue) -> Self {
        Self {
            transform,
            input,
            output,
            counters: TelemetryCounters::default(),
            times: StageTimes::default(),
        }
    }

    pub fn run(&mut self) -> Result<(), StreamError> {
        let tag = T::STAGE.tag();
        loop {
            match self.input.pop()? {
                Message::Data(line) => {
                    let start = Instant::now();
                    let line = self.transform.apply(line, &mut self.counters);
                    self.times.add(T::STAGE, start.elapsed());
                    trace!("[{tag}] forwarding {} chars", line.chars().count());
                    self.output.push(Message::Data(line))?;
                }
                Message::EndOfStream => {
                    self.output.push(Message::EndOfStream)?;
                    debug!("[{tag}] forwarded end-of-stream");
                    return Ok(());
                }
            }
        }
    }

    pub fn into_report(self, result: Result<(), StreamError>) -> StageReport {
        StageReport::new(T::STAGE, result, self.counters, self.times)
    }
}
