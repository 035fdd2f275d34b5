//! Event Rings (C3) — the generic fixed-capacity SPSC ring embedded in the
//! shared page.
//!
//! Adapted from the teacher's `slot_pool::IndexRing`, which rings fixed-size
//! `u32` slot indices between a free list and a ready list. The wire format
//! here is simpler: base spec calls for two rings of fixed-size event
//! records (not index indirection into a separate slot pool), each with
//! capacity 32, using the textbook fixed-capacity SPSC discipline —
//! `front == back` means empty, `(back + 1) mod N == front` means full —
//! rather than the teacher's `head.wrapping_sub(tail) >= capacity` variant,
//! since base spec's invariants are phrased in front/back terms directly.

use std::mem::MaybeUninit;
#[cfg(feature = "loom")]
use loom::sync::atomic::{AtomicU32, Ordering};
#[cfg(not(feature = "loom"))]
use std::sync::atomic::{AtomicU32, Ordering};

/// Outcome of [`EventRing::enqueue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The record was written and the ring's `front` pointer advanced.
    Ok,
    /// `(back + 1) mod N == front`: the ring is full.
    Full,
}

/// Outcome of [`EventRing::poll`].
#[derive(Clone, Copy, Debug)]
pub enum PollOutcome<T> {
    /// The record at `back` was read out and the pointer advanced.
    Ok(T),
    /// `front == back`: the ring is empty.
    Empty,
}

/// A single-producer/single-consumer ring of fixed-size `T` records,
/// embedded directly in the shared page (no separate allocation). `CAP`
/// must match the capacity both sides agree on at page-layout time; base
/// spec's default is 32.
///
/// `front` is the producer's write cursor, `back` is the consumer's read
/// cursor, matching the naming base spec uses in its invariants.
#[repr(C)]
pub struct EventRing<T: Copy, const CAP: usize> {
    front: AtomicU32,
    back: AtomicU32,
    slots: [MaybeUninit<T>; CAP],
}

impl<T: Copy, const CAP: usize> EventRing<T, CAP> {
    /// Constructs an empty ring. `CAP` must be nonzero; a `CAP` of one
    /// ring's single slot is always both the "next free" and "next full"
    /// position so nothing could ever be stored, which is never a valid
    /// event-ring configuration.
    pub fn new() -> Self {
        assert!(CAP > 1, "event ring capacity must exceed 1");
        EventRing {
            front: AtomicU32::new(0),
            back: AtomicU32::new(0),
            // SAFETY: an array of `MaybeUninit` never needs initialization.
            slots: unsafe { MaybeUninit::uninit().assume_init() },
        }
    }

    /// Number of records currently queued.
    pub fn len(&self) -> usize {
        let front = self.front.load(Ordering::Acquire);
        let back = self.back.load(Ordering::Acquire);
        (front.wrapping_sub(back) as usize) % CAP
    }

    /// True when `front == back`.
    pub fn is_empty(&self) -> bool {
        self.front.load(Ordering::Acquire) == self.back.load(Ordering::Acquire)
    }

    /// True when `(back + 1) mod CAP == front`.
    pub fn is_full(&self) -> bool {
        let front = self.front.load(Ordering::Acquire) as usize;
        let back = self.back.load(Ordering::Acquire) as usize;
        (back + 1) % CAP == front
    }

    /// Producer-side: writes `value` at `front` and advances it, unless the
    /// ring is full.
    pub fn enqueue(&self, value: T) -> EnqueueOutcome {
        let front = self.front.load(Ordering::Relaxed) as usize;
        let back = self.back.load(Ordering::Acquire) as usize;

        if (back + 1) % CAP == front % CAP {
            return EnqueueOutcome::Full;
        }

        // SAFETY: `front % CAP` is in bounds and not concurrently read
        // because the consumer only reads slots strictly before `front`
        // (i.e. at or after `back`), and the producer is the sole writer.
        unsafe {
            let slot = self.slots.as_ptr().add(front % CAP) as *mut MaybeUninit<T>;
            (*slot).write(value);
        }

        self.front
            .store(((front + 1) % CAP) as u32, Ordering::Release);
        EnqueueOutcome::Ok
    }

    /// Consumer-side: reads the record at `back` and advances it, unless the
    /// ring is empty.
    pub fn poll(&self) -> PollOutcome<T> {
        let back = self.back.load(Ordering::Relaxed) as usize;
        let front = self.front.load(Ordering::Acquire) as usize;

        if back == front {
            return PollOutcome::Empty;
        }

        // SAFETY: `back % CAP` was written by the producer before it
        // published the new `front`, and the consumer is the sole reader.
        let value = unsafe { self.slots[back % CAP].assume_init() };

        self.back
            .store(((back + 1) % CAP) as u32, Ordering::Release);
        PollOutcome::Ok(value)
    }
}

impl<T: Copy, const CAP: usize> Default for EventRing<T, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

/// Forwards up to `fairness_fraction * CAP` records from `src` matching
/// `accept` into `dst` in a single pass, returning the number transferred.
///
/// This is `queue_transfer` from base spec §4.3: the parent uses it to move
/// a filtered, fairness-bounded subset of one source's outbound ring into
/// the shared main event bus each tick, so no single chatty source can
/// starve the others. `fairness_fraction` must be in `(0, 1]`; the base
/// spec's default is 0.5.
pub fn queue_transfer<T: Copy, const SRC_CAP: usize, const DST_CAP: usize>(
    src: &EventRing<T, SRC_CAP>,
    dst: &EventRing<T, DST_CAP>,
    mut accept: impl FnMut(&T) -> bool,
    fairness_fraction: f32,
) -> usize {
    debug_assert!(
        fairness_fraction > 0.0 && fairness_fraction <= 1.0,
        "fairness_fraction must be in (0, 1]"
    );
    let budget = ((SRC_CAP as f32) * fairness_fraction).ceil().max(1.0) as usize;

    let mut forwarded = 0;
    while forwarded < budget {
        let value = match src.poll() {
            PollOutcome::Ok(value) => value,
            PollOutcome::Empty => break,
        };
        if !accept(&value) {
            continue;
        }
        if let EnqueueOutcome::Full = dst.enqueue(value) {
            break;
        }
        forwarded += 1;
    }
    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ring_polls_empty() {
        let ring: EventRing<u64, 32> = EventRing::new();
        assert!(ring.is_empty());
        assert!(matches!(ring.poll(), PollOutcome::Empty));
    }

    #[test]
    fn enqueue_then_poll_round_trips_fifo() {
        let ring: EventRing<u64, 32> = EventRing::new();
        for value in 0..5 {
            assert_eq!(ring.enqueue(value), EnqueueOutcome::Ok);
        }
        for expected in 0..5 {
            match ring.poll() {
                PollOutcome::Ok(value) => assert_eq!(value, expected),
                PollOutcome::Empty => panic!("ring should not be empty"),
            }
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn ring_rejects_the_capacity_plus_first_event() {
        let ring: EventRing<u32, 32> = EventRing::new();
        for i in 0..31 {
            assert_eq!(ring.enqueue(i), EnqueueOutcome::Ok);
        }
        assert!(ring.is_full());
        assert_eq!(ring.enqueue(999), EnqueueOutcome::Full);
    }

    #[test]
    fn churn_does_not_leak_capacity() {
        let ring: EventRing<u32, 4> = EventRing::new();
        for round in 0..100u32 {
            assert_eq!(ring.enqueue(round), EnqueueOutcome::Ok);
            assert_eq!(ring.enqueue(round + 1), EnqueueOutcome::Ok);
            assert_eq!(ring.enqueue(round + 2), EnqueueOutcome::Ok);
            assert_eq!(ring.enqueue(999), EnqueueOutcome::Full);
            assert!(matches!(ring.poll(), PollOutcome::Ok(_)));
            assert!(matches!(ring.poll(), PollOutcome::Ok(_)));
            assert!(matches!(ring.poll(), PollOutcome::Ok(_)));
            assert!(ring.is_empty());
        }
    }

    #[test]
    fn queue_transfer_respects_fairness_budget() {
        let src: EventRing<u32, 32> = EventRing::new();
        let dst: EventRing<u32, 32> = EventRing::new();
        for i in 0..20 {
            assert_eq!(src.enqueue(i), EnqueueOutcome::Ok);
        }
        let moved = queue_transfer(&src, &dst, |_| true, 0.5);
        assert_eq!(moved, 16); // ceil(32 * 0.5)
        assert_eq!(src.len(), 4);
        assert_eq!(dst.len(), 16);
    }

    #[test]
    fn queue_transfer_filters_by_predicate() {
        let src: EventRing<u32, 32> = EventRing::new();
        let dst: EventRing<u32, 32> = EventRing::new();
        for i in 0..10 {
            assert_eq!(src.enqueue(i), EnqueueOutcome::Ok);
        }
        let moved = queue_transfer(&src, &dst, |v| v % 2 == 0, 1.0);
        assert_eq!(moved, 5);
        assert!(src.is_empty());
    }

    #[cfg(feature = "loom")]
    mod loom_tests {
        use super::*;
        use std::sync::Arc;

        #[test]
        #[ignore]
        fn spsc_single_producer_consumer_never_corrupts() {
            loom::model(|| {
                let ring: Arc<EventRing<u32, 4>> = Arc::new(EventRing::new());
                let producer_ring = Arc::clone(&ring);
                let producer = loom::thread::spawn(move || {
                    for i in 0..3u32 {
                        while producer_ring.enqueue(i) == EnqueueOutcome::Full {
                            loom::thread::yield_now();
                        }
                    }
                });

                let mut seen = Vec::new();
                while seen.len() < 3 {
                    if let PollOutcome::Ok(v) = ring.poll() {
                        seen.push(v);
                    } else {
                        loom::thread::yield_now();
                    }
                }
                producer.join().unwrap();
                assert_eq!(seen, vec![0, 1, 2]);
            });
        }
    }
}
