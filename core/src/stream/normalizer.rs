//! Second stage: line terminators inside a line become spaces.

use crate::constants::LINE_TERMINATORS;
use crate::stream::stage::LineTransform;
use crate::telemetry::{Stage, TelemetryCounters};

/// Replace every `\n` and `\r` in `line` with one space.
///
/// Character count is preserved. Returns the rewritten line and how many
/// characters were replaced; a line without terminators comes back as-is.
pub fn normalize_line(line: String) -> (String, usize) {
    let replaced = line.matches(LINE_TERMINATORS).count();
    if replaced == 0 {
        return (line, 0);
    }
    (line.replace(LINE_TERMINATORS, " "), replaced)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LineNormalizer;

impl LineTransform for LineNormalizer {
    const STAGE: Stage = Stage::Normalize;

    fn apply(&mut self, line: String, counters: &mut TelemetryCounters) -> String {
        let (line, replaced) = normalize_line(line);
        counters.add_normalized(replaced);
        line
    }
}
