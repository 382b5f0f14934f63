//! Default pipeline constants.
//!
//! Every value here is a *default* only; `PipelineConfig` carries the
//! runtime values used by a run.

use std::time::Duration;

/// Slots per inter-stage queue.
pub const DEFAULT_QUEUE_CAP: usize = 50;
/// Maximum characters per input line, terminator included.
pub const DEFAULT_MAX_LINE_LEN: usize = 1000;
/// Data lines the reader forwards before stopping on its own.
pub const DEFAULT_MAX_INPUT_LINES: usize = 50;
/// Width of one output record, terminator excluded.
pub const DEFAULT_RECORD_WIDTH: usize = 80;

/// In-band text that ends the input stream.
pub const DEFAULT_SENTINEL: &str = "STOP";
/// Character whose adjacent pairs get collapsed.
pub const DEFAULT_MARKER: char = '+';
/// Character a collapsed pair becomes.
pub const DEFAULT_REPLACEMENT: char = '^';

/// Terminator appended to every emitted record.
pub const RECORD_TERMINATOR: char = '\n';

/// Characters the normalizer rewrites to a space.
pub const LINE_TERMINATORS: &[char] = &['\n', '\r'];

/// Sanity bounds checked by `PipelineConfig::validate`.
pub const MAX_QUEUE_CAP: usize = 64 * 1024;
pub const MAX_LINE_LEN_CAP: usize = 1024 * 1024;
pub const MAX_RECORD_WIDTH: usize = 1024 * 1024;

/// Worst-case UTF-8 width of one character; bounds bytes read per line.
pub const MAX_UTF8_WIDTH: usize = 4;

/// How long `join_timeout` waits for stages after cancelling before it
/// detaches the ones still blocked.
pub const JOIN_GRACE: Duration = Duration::from_millis(250);
