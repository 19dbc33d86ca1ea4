//! Property-based invariant tests for the input ring.
//!
//! 1. Bytes come out in the order they went in while the ring has room.
//! 2. Overrun drops the oldest bytes; the newest `capacity - 1` survive.
//! 3. The overrun counter equals the number of dropped bytes.
//! 4. `len` never exceeds `capacity - 1`.
//! 5. A pushed-back byte is the next one popped.
//! 6. Producer handles and the consumer see the same queue.

use hpterm_core::{RingBuffer, SharedRing};
use proptest::prelude::*;

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_capacity() -> impl Strategy<Value = usize> {
    2usize..=64
}

fn arb_bytes(max: usize) -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..=max)
}

fn drain(ring: &mut RingBuffer) -> Vec<u8> {
    std::iter::from_fn(|| ring.pop()).collect()
}

proptest! {
    #[test]
    fn fifo_within_capacity(capacity in arb_capacity(), bytes in arb_bytes(64)) {
        let mut ring = RingBuffer::new(capacity);
        let fit = bytes.len().min(capacity - 1);
        let lost = ring.extend_from_slice(&bytes[..fit]);
        prop_assert_eq!(lost, 0);
        prop_assert_eq!(drain(&mut ring), bytes[..fit].to_vec());
    }

    #[test]
    fn overrun_keeps_newest(capacity in arb_capacity(), bytes in arb_bytes(200)) {
        let mut ring = RingBuffer::new(capacity);
        let lost = ring.extend_from_slice(&bytes);
        let keep = bytes.len().min(capacity - 1);
        prop_assert_eq!(lost, bytes.len() - keep);
        prop_assert_eq!(ring.overruns(), (bytes.len() - keep) as u64);
        prop_assert_eq!(drain(&mut ring), bytes[bytes.len() - keep..].to_vec());
    }

    #[test]
    fn len_is_bounded(capacity in arb_capacity(), ops in proptest::collection::vec(any::<Option<u8>>(), 0..300)) {
        let mut ring = RingBuffer::new(capacity);
        for op in ops {
            match op {
                Some(byte) => { ring.push(byte); }
                None => { ring.pop(); }
            }
            prop_assert!(ring.len() < ring.capacity());
            prop_assert_eq!(ring.is_empty(), ring.len() == 0);
        }
    }

    #[test]
    fn push_back_is_popped_next(capacity in 3usize..=64, bytes in arb_bytes(32), extra in any::<u8>()) {
        let mut ring = RingBuffer::new(capacity);
        ring.extend_from_slice(&bytes[..bytes.len().min(capacity - 2)]);
        ring.push_back(extra);
        prop_assert_eq!(ring.peek(), Some(extra));
        prop_assert_eq!(ring.pop(), Some(extra));
    }

    #[test]
    fn producer_and_consumer_share_the_queue(bytes in arb_bytes(100)) {
        let shared = SharedRing::new(128);
        let producer = shared.producer();
        prop_assert_eq!(producer.push_bytes(&bytes), 0);
        prop_assert_eq!(shared.len(), bytes.len());
        let out: Vec<u8> = std::iter::from_fn(|| shared.pop()).collect();
        prop_assert_eq!(out, bytes);
    }
}

#[test]
fn producer_thread_feeds_consumer_in_order() {
    let shared = SharedRing::new(4096);
    let producer = shared.producer();
    let writer = std::thread::spawn(move || {
        for chunk in (0u8..=255).collect::<Vec<_>>().chunks(16) {
            producer.push_bytes(chunk);
        }
    });
    writer.join().unwrap();
    let out: Vec<u8> = std::iter::from_fn(|| shared.pop()).collect();
    assert_eq!(out, (0u8..=255).collect::<Vec<_>>());
}
