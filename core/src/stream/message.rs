use std::sync::Arc;

use crate::stream::queue::BoundedQueue;

/// Unit of work travelling between stages.
///
/// End of stream is a tag, not a magic string: once the reader has turned
/// the sentinel text into `EndOfStream`, no data line can be mistaken for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Data(String),
    EndOfStream,
}

impl From<String> for Message {
    fn from(line: String) -> Self {
        Message::Data(line)
    }
}

impl From<&str> for Message {
    fn from(line: &str) -> Self {
        Message::Data(line.to_owned())
    }
}

/// Queue linking two adjacent stages.
pub type LineQueue = BoundedQueue<Message>;

/// Shared handle to a `LineQueue`; a run holds one per link.
pub type SharedQueue = Arc<LineQueue>;
