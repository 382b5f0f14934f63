//! Third stage: adjacent marker pairs collapse into one replacement
//! character.

use crate::stream::stage::LineTransform;
use crate::telemetry::{Stage, TelemetryCounters};

/// Single left-to-right pass over `line`.
///
/// A marker immediately followed by another marker becomes one
/// `replacement` and both are consumed, so `"a+++b"` gives `"a^+b"`: the
/// third marker is only ever compared with what follows it. A trailing lone
/// marker is kept. Returns the new line and the number of pairs collapsed;
/// the line shrinks by exactly that many characters.
pub fn collapse_pairs(line: &str, marker: char, replacement: char) -> (String, usize) {
    let mut out = String::with_capacity(line.len());
    let mut pairs = 0;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == marker && chars.peek() == Some(&marker) {
            chars.next();
            out.push(replacement);
            pairs += 1;
        } else {
            out.push(c);
        }
    }
    (out, pairs)
}

#[derive(Debug, Clone, Copy)]
pub struct PairCollapser {
    pub marker: char,
    pub replacement: char,
}

impl PairCollapser {
    pub fn new(marker: char, replacement: char) -> Self {
        Self { marker, replacement }
    }
}

impl LineTransform for PairCollapser {
    const STAGE: Stage = Stage::Collapse;

    fn apply(&mut self, line: String, counters: &mut TelemetryCounters) -> String {
        let (out, pairs) = collapse_pairs(&line, self.marker, self.replacement);
        counters.add_collapsed(pairs);
        out
    }
}
