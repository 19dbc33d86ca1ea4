//! Fixed-capacity byte ring between the transport reader and the interpreter.
//!
//! The ring decouples asynchronous host input from the synchronous protocol
//! loop. Primary responsibilities:
//! - FIFO delivery of host bytes to the interpreter,
//! - overwrite-oldest behaviour with an overrun counter when the host outruns us,
//! - a single-byte push-back used to re-inject a synthetic trigger byte.
//!
//! [`SharedRing`] puts the ring behind a mutex so a transport thread can push
//! while the interpreter thread pops. `peek` and `push_back` are only ever
//! called by the consumer on its own data.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

/// Ring size used by a default session.
pub const DEFAULT_RING_CAPACITY: usize = 4096;

/// Byte ring with `read`/`write` indices modulo the capacity.
///
/// `read == write` means empty, so at most `capacity - 1` bytes are held.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    buf: Box<[u8]>,
    read: usize,
    write: usize,
    overruns: u64,
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}

impl RingBuffer {
    /// Create a ring with `capacity` slots (clamped to at least 2).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(2)].into_boxed_slice(),
            read: 0,
            write: 0,
            overruns: 0,
        }
    }

    /// Number of slots, including the one kept free to tell full from empty.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        (self.write + self.buf.len() - self.read) % self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == self.buf.len() - 1
    }

    /// Whether any unread byte is waiting.
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.is_empty()
    }

    /// Total bytes lost to overruns since creation.
    #[must_use]
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Append a byte. Returns `false` when the oldest unread byte was dropped.
    pub fn push(&mut self, byte: u8) -> bool {
        let mut clean = true;
        if self.is_full() {
            self.read = self.advance(self.read);
            self.overruns += 1;
            clean = false;
            warn!(
                read = self.read,
                write = self.write,
                overruns = self.overruns,
                "ring buffer overrun"
            );
        }
        self.buf[self.write] = byte;
        self.write = self.advance(self.write);
        clean
    }

    /// Append a run of bytes. Returns the number of bytes lost to overrun.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| !self.push(b)).count()
    }

    /// Take the oldest unread byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.buf[self.read];
        self.read = self.advance(self.read);
        Some(byte)
    }

    /// Look at the oldest unread byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.buf[self.read])
        }
    }

    /// Re-insert `byte` at the read position so it is the next one popped.
    ///
    /// On a full ring the newest unread byte makes room and counts as an overrun.
    pub fn push_back(&mut self, byte: u8) {
        if self.is_full() {
            self.write = self.retreat(self.write);
            self.overruns += 1;
            warn!(overruns = self.overruns, "ring buffer overrun on push-back");
        }
        self.read = self.retreat(self.read);
        self.buf[self.read] = byte;
    }

    /// Drop all unread bytes.
    pub fn clear(&mut self) {
        self.read = self.write;
    }

    #[inline]
    fn advance(&self, idx: usize) -> usize {
        if idx + 1 == self.buf.len() { 0 } else { idx + 1 }
    }

    #[inline]
    fn retreat(&self, idx: usize) -> usize {
        if idx == 0 { self.buf.len() - 1 } else { idx - 1 }
    }
}

/// Mutex-guarded ring shared by one producer and one consumer.
#[derive(Debug, Clone, Default)]
pub struct SharedRing {
    inner: Arc<Mutex<RingBuffer>>,
}

impl SharedRing {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RingBuffer::new(capacity))),
        }
    }

    /// Lock the ring. A poisoned lock is recovered: the indices are always
    /// left consistent by every method above.
    pub fn lock(&self) -> MutexGuard<'_, RingBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Producer-side handle for a transport reader.
    #[must_use]
    pub fn producer(&self) -> RingProducer {
        RingProducer {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn pop(&self) -> Option<u8> {
        self.lock().pop()
    }

    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.lock().peek()
    }

    pub fn push_back(&self, byte: u8) {
        self.lock().push_back(byte);
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.lock().has_data()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Free slots before the next push overruns.
    #[must_use]
    pub fn free(&self) -> usize {
        let ring = self.lock();
        ring.capacity() - 1 - ring.len()
    }
}

/// Push-only view of a [`SharedRing`], handed to transport threads.
#[derive(Debug, Clone)]
pub struct RingProducer {
    inner: Arc<Mutex<RingBuffer>>,
}

impl RingProducer {
    /// Append host bytes. Returns the number of bytes lost to overrun.
    pub fn push_bytes(&self, bytes: &[u8]) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes)
    }

    pub fn push(&self, byte: u8) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(byte)
    }

    /// Bytes that can be pushed without overrunning.
    #[must_use]
    pub fn free(&self) -> usize {
        let ring = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        ring.capacity() - 1 - ring.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_returns_bytes_in_push_order() {
        let mut ring = RingBuffer::new(8);
        ring.extend_from_slice(b"abc");
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.pop(), Some(b'a'));
        assert_eq!(ring.pop(), Some(b'b'));
        assert_eq!(ring.pop(), Some(b'c'));
        assert_eq!(ring.pop(), None);
        assert!(!ring.has_data());
    }

    #[test]
    fn indices_wrap_around_capacity() {
        let mut ring = RingBuffer::new(4);
        for round in 0..10u8 {
            ring.push(round);
            ring.push(round.wrapping_add(100));
            assert_eq!(ring.pop(), Some(round));
            assert_eq!(ring.pop(), Some(round.wrapping_add(100)));
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn overrun_drops_oldest_and_counts() {
        let mut ring = RingBuffer::new(4);
        assert_eq!(ring.extend_from_slice(b"abc"), 0);
        assert!(ring.is_full());
        assert!(!ring.push(b'd'));
        assert_eq!(ring.overruns(), 1);
        assert_eq!(ring.pop(), Some(b'b'));
        assert_eq!(ring.pop(), Some(b'c'));
        assert_eq!(ring.pop(), Some(b'd'));
    }

    #[test]
    fn push_back_is_next_byte_popped() {
        let mut ring = RingBuffer::new(8);
        ring.extend_from_slice(b"xy");
        assert_eq!(ring.pop(), Some(b'x'));
        ring.push_back(0x11);
        assert_eq!(ring.peek(), Some(0x11));
        assert_eq!(ring.pop(), Some(0x11));
        assert_eq!(ring.pop(), Some(b'y'));
    }

    #[test]
    fn push_back_into_empty_ring_wraps_read_index() {
        let mut ring = RingBuffer::new(4);
        ring.push_back(b'z');
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.pop(), Some(b'z'));
        assert!(ring.is_empty());
    }

    #[test]
    fn producer_and_consumer_share_one_ring() {
        let shared = SharedRing::new(16);
        let producer = shared.producer();
        let handle = std::thread::spawn(move || producer.push_bytes(b"hello"));
        let lost = handle.join().expect("producer thread");
        assert_eq!(lost, 0);
        let mut out = Vec::new();
        while let Some(b) = shared.pop() {
            out.push(b);
        }
        assert_eq!(out, b"hello");
        assert_eq!(shared.free(), 15);
    }
}
