// # src/stream/config.rs

//! Runtime configuration of one pipeline run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MARKER, DEFAULT_MAX_INPUT_LINES, DEFAULT_MAX_LINE_LEN, DEFAULT_QUEUE_CAP,
    DEFAULT_RECORD_WIDTH, DEFAULT_REPLACEMENT, DEFAULT_SENTINEL, LINE_TERMINATORS,
    MAX_LINE_LEN_CAP, MAX_QUEUE_CAP, MAX_RECORD_WIDTH,
};
use crate::types::StreamError;

/// What the writer does with text shorter than one record at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResiduePolicy {
    /// Emit the residue as a short final record.
    #[default]
    Flush,
    /// Drop the residue.
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub queue_capacity: usize,
    pub max_line_len: usize,
    pub max_input_lines: usize,
    pub record_width: usize,
    pub sentinel: String,
    pub marker: char,
    pub replacement: char,
    pub residue: ResiduePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAP,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            max_input_lines: DEFAULT_MAX_INPUT_LINES,
            record_width: DEFAULT_RECORD_WIDTH,
            sentinel: DEFAULT_SENTINEL.to_owned(),
            marker: DEFAULT_MARKER,
            replacement: DEFAULT_REPLACEMENT,
            residue: ResiduePolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }

    pub fn with_max_input_lines(mut self, lines: usize) -> Self {
        self.max_input_lines = lines;
        self
    }

    pub fn with_record_width(mut self, width: usize) -> Self {
        self.record_width = width;
        self
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn with_pair(mut self, marker: char, replacement: char) -> Self {
        self.marker = marker;
        self.replacement = replacement;
        self
    }

    pub fn with_residue(mut self, residue: ResiduePolicy) -> Self {
        self.residue = residue;
        self
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, StreamError> {
        serde_json::from_str(text)
            .map_err(|e| StreamError::Validation(format!("invalid config: {e}")))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Reject configurations the stages cannot run with.
    pub fn validate(&self) -> Result<(), StreamError> {
        check_range("queue_capacity", self.queue_capacity, MAX_QUEUE_CAP)?;
        check_range("max_line_len", self.max_line_len, MAX_LINE_LEN_CAP)?;
        check_range("record_width", self.record_width, MAX_RECORD_WIDTH)?;
        if self.max_input_lines == 0 {
            return Err(StreamError::Validation(
                "max_input_lines must be at least 1".into(),
            ));
        }

        if self.sentinel.is_empty() {
            return Err(StreamError::Validation("sentinel must not be empty".into()));
        }
        if self.sentinel.contains(LINE_TERMINATORS) {
            return Err(StreamError::Validation(
                "sentinel must not contain a line terminator".into(),
            ));
        }
        if self.sentinel.chars().count() >= self.max_line_len {
            return Err(StreamError::Validation(format!(
                "sentinel does not fit in a {}-character line",
                self.max_line_len
            )));
        }

        if self.marker == self.replacement {
            return Err(StreamError::Validation(format!(
                "marker and replacement are both {:?}",
                self.marker
            )));
        }
        for (name, c) in [("marker", self.marker), ("replacement", self.replacement)] {
            if LINE_TERMINATORS.contains(&c) {
                return Err(StreamError::Validation(format!(
                    "{name} must not be a line terminator"
                )));
            }
        }
        Ok(())
    }
}

fn check_range(name: &str, value: usize, max: usize) -> Result<(), StreamError> {
    if value == 0 || value > max {
        return Err(StreamError::Validation(format!(
            "invalid {name}: {value}, must be within 1..={max}"
        )));
    }
    Ok(())
}
