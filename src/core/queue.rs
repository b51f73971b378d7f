//! Segmented blocking queue between producers and a single consumer
//!
//! Storage is a chain of fixed-capacity segments guarded by one mutex. A
//! segment is retired to a bounded free list only once it is fully drained
//! and a successor exists, so a consumer never observes retired storage.
//! Closing rejects new pushes but never discards queued items; the consumer
//! sees `closed` only after the queue is also fully drained.
//!
//! There is no backpressure: under sustained overload memory grows without
//! bound, one segment at a time. That is a deliberate trade inherited from
//! the design, not an oversight.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Slots per segment.
const SEGMENT_SIZE: usize = 64;
/// Retired segments kept for reuse.
const MAX_FREE_SEGMENTS: usize = 4;
/// Sleep between lock retries in [`SegmentedQueue::pop_blocking`].
const POLL_INTERVAL: Duration = Duration::from_micros(100);

struct Segment<T> {
    data: Vec<Option<T>>,
    /// Next slot to consume.
    pos: usize,
    /// Next free slot to produce.
    end: usize,
}

impl<T> Segment<T> {
    fn new() -> Self {
        Self {
            data: (0..SEGMENT_SIZE).map(|_| None).collect(),
            pos: 0,
            end: 0,
        }
    }

    fn reset(&mut self) {
        self.pos = 0;
        self.end = 0;
    }
}

struct Inner<T> {
    /// Front segment is the oldest undrained one; back accepts pushes.
    segments: VecDeque<Segment<T>>,
    free: Vec<Segment<T>>,
    len: usize,
    closed: bool,
}

impl<T> Inner<T> {
    fn push_item(&mut self, item: T) {
        let back = self.segments.back_mut().expect("queue always has a tail segment");
        back.data[back.end] = Some(item);
        back.end += 1;
        let filled = back.end == SEGMENT_SIZE;
        self.len += 1;
        if filled {
            let fresh = self.free.pop().unwrap_or_else(Segment::new);
            self.segments.push_back(fresh);
        }
    }

    /// Oldest item, retiring drained front segments along the way. `None`
    /// when no data is currently queued.
    fn pop_item(&mut self) -> Option<T> {
        loop {
            let front = self.segments.front_mut().expect("queue always has a head segment");
            if front.pos < front.end {
                let item = front.data[front.pos].take();
                front.pos += 1;
                self.len -= 1;
                return item;
            }
            let drained = front.pos == SEGMENT_SIZE;
            if drained && self.segments.len() > 1 {
                let mut retired = self.segments.pop_front().expect("front checked above");
                retired.reset();
                if self.free.len() < MAX_FREE_SEGMENTS {
                    self.free.push(retired);
                }
                continue;
            }
            return None;
        }
    }
}

/// Bounded-memory-per-node, unbounded-length FIFO connecting any number of
/// producers to one consumer.
pub struct SegmentedQueue<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> SegmentedQueue<T> {
    pub fn new() -> Self {
        let mut segments = VecDeque::with_capacity(2);
        segments.push_back(Segment::new());
        Self {
            inner: Mutex::new(Inner {
                segments,
                free: Vec::new(),
                len: 0,
                closed: false,
            }),
        }
    }

    /// Append `item`; a closed queue rejects the push and hands the item
    /// back so the caller can deliver it another way.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(item);
        }
        inner.push_item(item);
        Ok(())
    }

    /// Append `item` even when the queue is closed. This is an explicit
    /// override of the close contract for items that must not be lost
    /// regardless of shutdown state; ordinary producers use [`push`].
    ///
    /// [`push`]: SegmentedQueue::push
    pub fn push_force(&self, item: T) {
        let mut inner = self.inner.lock();
        inner.push_item(item);
    }

    /// Oldest item without waiting. The flag is `true` only when the queue
    /// is closed and no data was available.
    pub fn try_pop(&self) -> (Option<T>, bool) {
        let mut inner = self.inner.lock();
        match inner.pop_item() {
            Some(item) => (Some(item), false),
            None => (None, inner.closed),
        }
    }

    /// Oldest item, waiting for one to arrive. Returns `(None, true)` only
    /// once the queue is closed *and* fully drained; queued items are always
    /// delivered before the close is observed.
    pub fn pop_blocking(&self) -> (Option<T>, bool) {
        loop {
            {
                let mut inner = self.inner.lock();
                if let Some(item) = inner.pop_item() {
                    return (Some(item), false);
                }
                if inner.closed {
                    return (None, true);
                }
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Forbid further pushes. Idempotent; queued items stay deliverable.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    /// Clear the closed flag, accepting pushes again. Idempotent.
    pub fn open(&self) {
        self.inner.lock().closed = false;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for SegmentedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
