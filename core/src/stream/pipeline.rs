// # src/stream/pipeline.rs

// ## Pure pipeline wiring (no transform logic)

use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use crate::constants::JOIN_GRACE;
use crate::stream::cancel::{CancelHandle, CancelOnPanic};
use crate::stream::collapser::PairCollapser;
use crate::stream::config::PipelineConfig;
use crate::stream::io::LineSource;
use crate::stream::message::{LineQueue, SharedQueue};
use crate::stream::normalizer::LineNormalizer;
use crate::stream::reader::Reader;
use crate::stream::stage::{StageExit, StageReport, TransformStage};
use crate::stream::writer::ChunkedWriter;
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::StreamError;

/// A running four-stage pipeline.
///
/// Reader → Q1 → LineNormalizer → Q2 → PairCollapser → Q3 → ChunkedWriter,
/// one OS thread per stage. Dropping a `Pipeline` without joining cancels it
/// and waits for the threads.
pub struct Pipeline {
    handles: Vec<(Stage, JoinHandle<()>)>,
    reports: Receiver<StageReport>,
    cancel: CancelHandle,
    timer: TelemetryTimer,
}

impl Pipeline {
    /// Validate `config`, build the three queues and start all four stages.
    pub fn spawn<S, W>(source: S, sink: W, config: &PipelineConfig) -> Result<Self, StreamError>
    where
        S: LineSource + 'static,
        W: Write + Send + 'static,
    {
        config.validate()?;
        let timer = TelemetryTimer::new();

        // ---- Queues ----
        let q1: SharedQueue = Arc::new(LineQueue::new(config.queue_capacity));
        let q2: SharedQueue = Arc::new(LineQueue::new(config.queue_capacity));
        let q3: SharedQueue = Arc::new(LineQueue::new(config.queue_capacity));
        let cancel = CancelHandle::new(vec![q1.clone(), q2.clone(), q3.clone()]);

        let (report_tx, report_rx) = unbounded::<StageReport>();
        let mut pipeline = Self {
            handles: Vec::with_capacity(Stage::ALL.len()),
            reports: report_rx,
            cancel,
            timer,
        };

        info!(
            "[PIPELINE] start: queue_capacity={} record_width={} max_line_len={} max_input_lines={}",
            config.queue_capacity, config.record_width, config.max_line_len, config.max_input_lines
        );

        // Spawned in reverse so every consumer exists before its producer.
        // ---- Writer ----
        let mut writer = ChunkedWriter::new(q3.clone(), sink, config, pipeline.cancel.clone());
        pipeline.spawn_stage(Stage::Write, &report_tx, move || {
            let result = writer.run();
            writer.into_report(result)
        })?;

        // ---- Collapser ----
        let mut collapser = TransformStage::new(
            PairCollapser::new(config.marker, config.replacement),
            q2.clone(),
            q3,
        );
        pipeline.spawn_stage(Stage::Collapse, &report_tx, move || {
            let result = collapser.run();
            collapser.into_report(result)
        })?;

        // ---- Normalizer ----
        let mut normalizer = TransformStage::new(LineNormalizer, q1.clone(), q2);
        pipeline.spawn_stage(Stage::Normalize, &report_tx, move || {
            let result = normalizer.run();
            normalizer.into_report(result)
        })?;

        // ---- Reader ----
        let mut reader = Reader::new(source, q1, config);
        pipeline.spawn_stage(Stage::Read, &report_tx, move || {
            let result = reader.run();
            reader.into_report(result)
        })?;

        Ok(pipeline)
    }

    fn spawn_stage<F>(
        &mut self,
        stage: Stage,
        reports: &Sender<StageReport>,
        body: F,
    ) -> Result<(), StreamError>
    where
        F: FnOnce() -> StageReport + Send + 'static,
    {
        let tx = reports.clone();
        let guard_handle = self.cancel.clone();
        let spawned = thread::Builder::new()
            .name(stage.thread_name().into())
            .spawn(move || {
                let _guard = CancelOnPanic { stage, handle: guard_handle };
                debug!("[{}] started", stage.tag());
                let report = body();
                debug!("[{}] exiting: {:?}", stage.tag(), report.exit);
                // Coordinator gone means nobody is joining; nothing to do.
                let _ = tx.send(report);
            });

        match spawned {
            Ok(handle) => {
                self.handles.push((stage, handle));
                Ok(())
            }
            Err(e) => {
                // Stages already running would otherwise wait on a missing peer.
                self.cancel.cancel();
                Err(StreamError::Io(e))
            }
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for all four stages and merge their telemetry.
    ///
    /// Returns the first stage error in pipeline order. Stages that merely
    /// observed cancellation are not errors; a run cancelled from outside
    /// with no other failure returns `StreamError::Cancelled`.
    pub fn join(self) -> Result<TelemetrySnapshot, StreamError> {
        self.join_inner(None)
    }

    /// Like `join`, but cancels the run if it has not finished by `timeout`.
    ///
    /// Stages get `JOIN_GRACE` to wind down after the cancel. A stage still
    /// running after that (typically a reader blocked inside its source) is
    /// detached rather than joined, so this returns within
    /// `timeout + JOIN_GRACE`.
    pub fn join_timeout(self, timeout: Duration) -> Result<TelemetrySnapshot, StreamError> {
        self.join_inner(Some(Instant::now() + timeout))
    }

    fn join_inner(mut self, mut deadline: Option<Instant>) -> Result<TelemetrySnapshot, StreamError> {
        let mut reports: Vec<StageReport> = Vec::with_capacity(Stage::ALL.len());
        let mut timed_out = false;

        // Senders live only in stage threads, so disconnect means all exited.
        loop {
            let received = match deadline {
                None => self.reports.recv().map_err(|_| RecvTimeoutError::Disconnected),
                Some(at) => self.reports.recv_deadline(at),
            };
            match received {
                Ok(report) => reports.push(report),
                Err(RecvTimeoutError::Timeout) if !timed_out => {
                    warn!("[PIPELINE] deadline reached, cancelling");
                    self.cancel.cancel();
                    timed_out = true;
                    deadline = Some(Instant::now() + JOIN_GRACE);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let mut panicked = Vec::new();
        for (stage, handle) in self.handles.drain(..) {
            let reported = reports.iter().any(|r| r.stage == stage);
            if timed_out && !reported && !handle.is_finished() {
                // Dropping the handle detaches the thread.
                warn!("[{}] still blocked after cancel, detaching", stage.tag());
                continue;
            }
            if handle.join().is_err() {
                panicked.push(stage);
            }
        }
        self.timer.finish();

        self.summarize(reports, panicked)
    }

    fn summarize(
        &self,
        mut reports: Vec<StageReport>,
        panicked: Vec<Stage>,
    ) -> Result<TelemetrySnapshot, StreamError> {
        reports.sort_by_key(|r| stage_order(r.stage));

        let mut counters = TelemetryCounters::default();
        let mut timer = self.timer.clone();
        let mut reader_exit = None;
        let stage_exits: Vec<(Stage, StageExit)> = reports.iter().map(|r| (r.stage, r.exit)).collect();
        for r in &reports {
            counters.merge(&r.counters);
            timer.stage_times.merge(&r.times);
            if r.stage == Stage::Read {
                reader_exit = r.reader_exit;
            }
        }

        let mut first_error: Option<(Stage, StreamError)> = None;
        for r in reports {
            if let Some(e) = r.error {
                if first_error.is_none() {
                    first_error = Some((r.stage, e));
                }
            }
        }
        if let Some(stage) = panicked.into_iter().min_by_key(|s| stage_order(*s)) {
            let earlier = first_error
                .as_ref()
                .is_some_and(|(s, _)| stage_order(*s) < stage_order(stage));
            if !earlier {
                first_error = Some((stage, StreamError::StagePanicked(stage)));
            }
        }

        if let Some((stage, e)) = first_error {
            warn!("[PIPELINE] {stage} stage failed: {e}");
            return Err(e);
        }
        // A cancel that lands after every stage saw end-of-stream changed nothing.
        let all_finished = stage_exits.len() == Stage::ALL.len()
            && stage_exits.iter().all(|(_, e)| *e == StageExit::Finished);
        if self.cancel.was_external() && !all_finished {
            return Err(StreamError::Cancelled);
        }

        let mut snapshot = TelemetrySnapshot::from(&counters, &timer, reader_exit);
        snapshot.stage_exits = stage_exits;
        info!(
            "[PIPELINE] done: {} lines in, {} records out, {:?}, {}",
            counters.lines_read,
            counters.records_emitted,
            snapshot.elapsed,
            snapshot.stage_times.summary()
        );
        Ok(snapshot)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        self.cancel.cancel();
        for (_, handle) in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn stage_order(stage: Stage) -> usize {
    Stage::ALL.iter().position(|s| *s == stage).unwrap_or(usize::MAX)
}

/// Spawn a pipeline and wait for it to finish.
pub fn run_pipeline<S, W>(source: S, sink: W, config: &PipelineConfig) -> Result<TelemetrySnapshot, StreamError>
where
    S: LineSource + 'static,
    W: Write + Send + 'static,
{
    Pipeline::spawn(source, sink, config)?.join()
}
