//! linepipe-core
//!
//! Four-stage, bounded-queue text pipeline.
//! No CLI, no logging subscriber; callers install their own.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;

pub mod telemetry;

// Pipeline
pub mod stream;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::stream::{
        run_pipeline, run_stream, ApiConfig, InputSource, LineSource, MemoryLines, OutputSink,
        Pipeline, PipelineConfig, ResiduePolicy,
    };
    pub use crate::telemetry::TelemetrySnapshot;
    pub use crate::types::StreamError;
}
