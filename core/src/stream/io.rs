// # src/stream/io.rs

//! Normalized I/O for the pipeline boundary: line sources on the way in,
//! byte sinks on the way out.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::constants::MAX_UTF8_WIDTH;
use crate::types::StreamError;

/// Canonical input abstraction
pub enum InputSource {
    Reader(Box<dyn Read + Send>),
    File(PathBuf),
    Memory(Vec<u8>),
}

/// Canonical output abstraction
pub enum OutputSink {
    Writer(Box<dyn Write + Send>),
    File(PathBuf),
    Memory,
}

/// Buffer behind a captured in-memory sink.
pub type CaptureBuffer = Arc<Mutex<Vec<u8>>>;

/// Anything that yields input lines one at a time.
///
/// `Ok(None)` means the source is exhausted, which is distinct from reading
/// the sentinel text. A returned line keeps its terminator if it had one.
pub trait LineSource: Send {
    fn next_line(&mut self) -> Result<Option<String>, StreamError>;
}

/// Line source over any buffered reader.
///
/// At most `MAX_UTF8_WIDTH * max_line_len + 1` bytes are pulled per line, so
/// an oversize line costs bounded memory; what was read comes back as-is and
/// the reader stage rejects it on length.
pub struct BufReadLines<R> {
    inner: R,
    byte_limit: u64,
}

impl<R: BufRead + Send> BufReadLines<R> {
    pub fn new(inner: R, max_line_len: usize) -> Self {
        let byte_limit = max_line_len
            .saturating_mul(MAX_UTF8_WIDTH)
            .saturating_add(1) as u64;
        Self { inner, byte_limit }
    }
}

impl<R: BufRead + Send> LineSource for BufReadLines<R> {
    fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        let mut buf = Vec::new();
        let n = (&mut self.inner)
            .take(self.byte_limit)
            .read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }

        let truncated = n as u64 == self.byte_limit && buf.last() != Some(&b'\n');
        if truncated {
            // May end mid-character; only its length matters from here on.
            return Ok(Some(String::from_utf8_lossy(&buf).into_owned()));
        }

        String::from_utf8(buf).map(Some).map_err(|e| {
            StreamError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}

/// In-memory line source, mostly for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemoryLines {
    lines: VecDeque<String>,
}

impl MemoryLines {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl LineSource for MemoryLines {
    fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        Ok(self.lines.pop_front())
    }
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        (**self).next_line()
    }
}

/// Normalize input source into a boxed line source
pub fn open_input(
    src: InputSource,
    max_line_len: usize,
) -> Result<Box<dyn LineSource>, StreamError> {
    let source: Box<dyn LineSource> = match src {
        InputSource::Reader(r) => Box::new(BufReadLines::new(BufReader::new(r), max_line_len)),
        InputSource::File(p) => Box::new(BufReadLines::new(
            BufReader::new(File::open(p)?),
            max_line_len,
        )),
        InputSource::Memory(b) => Box::new(BufReadLines::new(Cursor::new(b), max_line_len)),
    };
    Ok(source)
}

/// Normalize output sink into a boxed writer.
///
/// With `capture` set, a `Memory` sink records everything written and the
/// buffer handle is returned alongside the writer.
pub fn open_output(
    sink: OutputSink,
    capture: bool,
) -> Result<(Box<dyn Write + Send>, Option<CaptureBuffer>), StreamError> {
    match sink {
        OutputSink::Writer(w) => Ok((w, None)),
        OutputSink::File(p) => Ok((Box::new(File::create(p)?), None)),
        OutputSink::Memory if capture => {
            let buf = CaptureBuffer::default();
            let writer = SharedBufferWriter { buf: buf.clone() };
            Ok((Box::new(writer), Some(buf)))
        }
        OutputSink::Memory => Ok((Box::new(std::io::sink()), None)),
    }
}

/// Writer appending into a buffer another thread can read afterwards.
#[derive(Debug, Clone, Default)]
pub struct SharedBufferWriter {
    buf: CaptureBuffer,
}

impl SharedBufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> CaptureBuffer {
        self.buf.clone()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buf.lock().clone()
    }
}

impl Write for SharedBufferWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
