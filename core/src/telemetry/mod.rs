//! telemetry/mod.rs
//! Unified telemetry module: counters, timers, and immutable snapshots.
//!
//! - Each stage thread owns its own counters and timers; nothing is shared
//!   while the pipeline runs.
//! - The coordinator merges per-stage reports into one snapshot at join time.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
