//! Tear-down signal that works independently of the end-of-stream tag.
//!
//! Cancelling closes every queue of a run. Blocked pushes and pops wake up
//! with `QueueClosed` and each stage returns instead of waiting on a peer
//! that will never answer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error};

use crate::stream::message::SharedQueue;
use crate::telemetry::Stage;

/// Who asked for the tear-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// A caller holding a `CancelHandle`.
    External,
    /// A stage failed in a way its peers cannot observe through the queues.
    StageFailure(Stage),
}

struct CancelState {
    queues: Vec<SharedQueue>,
    cancelled: AtomicBool,
    external: AtomicBool,
}

#[derive(Clone)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    pub fn new(queues: Vec<SharedQueue>) -> Self {
        Self {
            state: Arc::new(CancelState {
                queues,
                cancelled: AtomicBool::new(false),
                external: AtomicBool::new(false),
            }),
        }
    }

    /// Close every queue of the run. Idempotent.
    pub fn cancel(&self) {
        self.cancel_with(CancelReason::External);
    }

    pub(crate) fn cancel_with(&self, reason: CancelReason) {
        if reason == CancelReason::External {
            self.state.external.store(true, Ordering::Release);
        }
        if self.state.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("[CANCEL] closing {} queues ({reason:?})", self.state.queues.len());
        for q in &self.state.queues {
            q.close();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// True if a caller, not a failing stage, cancelled the run.
    pub fn was_external(&self) -> bool {
        self.state.external.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .field("external", &self.was_external())
            .finish()
    }
}

/// Held by every stage thread; cancels the run if the stage unwinds.
pub(crate) struct CancelOnPanic {
    pub stage: Stage,
    pub handle: CancelHandle,
}

impl Drop for CancelOnPanic {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("[{}] stage panicked, cancelling pipeline", self.stage);
            self.handle.cancel_with(CancelReason::StageFailure(self.stage));
        }
    }
}
