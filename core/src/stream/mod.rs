//! stream: the four-stage line pipeline.
//!
//! Reader → Q1 → LineNormalizer → Q2 → PairCollapser → Q3 → ChunkedWriter.
//! Stages only talk through bounded queues; end-of-stream is a tagged
//! message forwarded exactly once through each queue.

pub mod cancel;
pub mod collapser;
pub mod config;
pub mod core;
pub mod io;
pub mod message;
pub mod normalizer;
pub mod pipeline;
pub mod queue;
pub mod reader;
pub mod stage;
pub mod writer;

pub use cancel::CancelHandle;
pub use collapser::{collapse_pairs, PairCollapser};
pub use config::{PipelineConfig, ResiduePolicy};
pub use self::core::{run_stream, ApiConfig};
pub use io::{BufReadLines, InputSource, LineSource, MemoryLines, OutputSink, SharedBufferWriter};
pub use message::{LineQueue, Message, SharedQueue};
pub use normalizer::{normalize_line, LineNormalizer};
pub use pipeline::{run_pipeline, Pipeline};
pub use queue::{BoundedQueue, QueueClosed, TryPushError};
pub use reader::{Reader, ReaderExit};
pub use stage::{StageExit, StageReport};
pub use writer::{Accumulator, ChunkedWriter};
