// # src/stream/queue.rs

//! Fixed-capacity blocking FIFO shared by two adjacent stages.
//!
//! The ring storage, indices and count live behind one mutex. Producers wait
//! on "non-full", consumers on "non-empty"; the lock is released for the whole
//! of every wait. Capacity never grows, so a slow consumer stalls its producer
//! instead of losing data.

use std::fmt;

use parking_lot::{Condvar, Mutex};

use crate::types::StreamError;

/// Returned by a push or pop on a queue closed through cancellation.
/// A failed push hands its item back.
#[derive(Debug, PartialEq, Eq)]
pub struct QueueClosed<T>(pub T);

impl<T> fmt::Display for QueueClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue closed")
    }
}

impl<T: fmt::Debug> std::error::Error for QueueClosed<T> {}

impl<T> From<QueueClosed<T>> for StreamError {
    fn from(_: QueueClosed<T>) -> Self {
        StreamError::QueueClosed
    }
}

/// Outcome of a failed `try_push`.
#[derive(Debug, PartialEq, Eq)]
pub enum TryPushError<T> {
    Full(T),
    Closed(T),
}

struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    count: usize,
    closed: bool,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            count: 0,
            closed: false,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    fn push_back(&mut self, item: T) {
        assert!(
            self.count < self.capacity(),
            "queue overrun: count {} at capacity {}",
            self.count,
            self.capacity()
        );
        let slot = &mut self.slots[self.tail];
        assert!(slot.is_none(), "queue slot {} still occupied", self.tail);
        *slot = Some(item);
        self.tail = (self.tail + 1) % self.capacity();
        self.count += 1;
    }

    fn pop_front(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let Some(item) = self.slots[self.head].take() else {
            panic!("queue slot {} empty with count {}", self.head, self.count);
        };
        self.head = (self.head + 1) % self.capacity();
        self.count -= 1;
        Some(item)
    }
}

pub struct BoundedQueue<T> {
    ring: Mutex<Ring<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items.
    ///
    /// # Panics
    /// If `capacity` is zero; `PipelineConfig::validate` rejects that first.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            ring: Mutex::new(Ring::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Block until a slot is free, then append `item`.
    pub fn push(&self, item: T) -> Result<(), QueueClosed<T>> {
        let mut ring = self.ring.lock();
        while ring.is_full() && !ring.closed {
            self.not_full.wait(&mut ring);
        }
        if ring.closed {
            return Err(QueueClosed(item));
        }
        ring.push_back(item);
        drop(ring);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Block until an item is available, then remove the oldest one.
    /// A closed queue still hands out what it holds before failing.
    pub fn pop(&self) -> Result<T, QueueClosed<()>> {
        let mut ring = self.ring.lock();
        loop {
            if let Some(item) = ring.pop_front() {
                drop(ring);
                self.not_full.notify_one();
                return Ok(item);
            }
            if ring.closed {
                return Err(QueueClosed(()));
            }
            self.not_empty.wait(&mut ring);
        }
    }

    pub fn try_push(&self, item: T) -> Result<(), TryPushError<T>> {
        let mut ring = self.ring.lock();
        if ring.closed {
            return Err(TryPushError::Closed(item));
        }
        if ring.is_full() {
            return Err(TryPushError::Full(item));
        }
        ring.push_back(item);
        drop(ring);
        self.not_empty.notify_one();
        Ok(())
    }

    pub fn try_pop(&self) -> Option<T> {
        let item = self.ring.lock().pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Refuse further pushes and wake every waiter on both sides.
    pub fn close(&self) {
        self.ring.lock().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.ring.lock().closed
    }

    pub fn len(&self) -> usize {
        self.ring.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.ring.lock().is_full()
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ring = self.ring.lock();
        f.debug_struct("BoundedQueue")
            .field("capacity", &ring.capacity())
            .field("len", &ring.count)
            .field("closed", &ring.closed)
            .finish()
    }
}
