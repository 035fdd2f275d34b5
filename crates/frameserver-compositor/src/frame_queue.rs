//! Frame Queues (C7).
//!
//! A bounded circular buffer of frame cells, producer-written and
//! compositor-read, SPSC so no locks are required on the queue itself
//! (base spec §4.7). Adapted from the teacher's `transport::SlotPool`
//! free/ready index-ring pair, simplified: this queue is never shared
//! across a process boundary (it lives entirely on the parent side,
//! refilled from the shared page by the producer step in
//! `frameserver-compositor::feed`'s `drain_producer`), so cells are owned
//! `Vec<u8>` buffers rather than slots into a `SharedRegion`.

use std::collections::VecDeque;

/// One queued frame: a decoded buffer tagged with the producer's PTS
/// (base spec §3's "Frame cell").
#[derive(Clone, Debug)]
pub struct FrameCell {
    pub buffer: Vec<u8>,
    pub size: u32,
    pub tag: i64,
}

/// Bounded circular buffer of [`FrameCell`]s. `capacity` is fixed for the
/// buffer's lifetime; base spec §4.5 requires frame queues to be dropped
/// unconditionally and reallocated on every resize rather than resized in
/// place, so this type has no `resize` method — callers construct a fresh
/// [`FrameQueue`] and drop the old one.
pub struct FrameQueue {
    capacity: usize,
    cells: VecDeque<FrameCell>,
}

impl FrameQueue {
    /// `alloc(cap, cell_size, producer_cb)` from base spec §4.7. The
    /// producer callback itself is owned by the caller (the worker thread
    /// that blocks on V/A and copies from the shared page); this type only
    /// owns the bounded storage it writes into.
    pub fn alloc(capacity: usize) -> Self {
        FrameQueue {
            capacity,
            cells: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.cells.len() >= self.capacity
    }

    /// Producer-side: enqueues a newly copied cell. Drops the oldest cell
    /// if the queue is already at capacity — base spec doesn't document a
    /// "reject new frames" behavior for a full queue, and a producer that
    /// blocks on a full compositor-side queue would stall the whole
    /// transfer, so the oldest (already stale) cell is evicted instead.
    pub fn enqueue(&mut self, buffer: Vec<u8>, tag: i64) {
        if self.is_full() {
            self.cells.pop_front();
        }
        let size = buffer.len() as u32;
        self.cells.push_back(FrameCell { buffer, size, tag });
    }

    /// Compositor-side: the next cell to present, without consuming it.
    pub fn front(&self) -> Option<&FrameCell> {
        self.cells.front()
    }

    /// Compositor-side: consumes and returns the front cell.
    pub fn dequeue(&mut self) -> Option<FrameCell> {
        self.cells.pop_front()
    }

    /// Drops every queued cell, used at teardown and immediately before a
    /// resize rebuilds the queue (base spec §4.5).
    pub fn free(&mut self) {
        self.cells.clear();
    }
}

impl crate::scheduler::FrontQueue for FrameQueue {
    fn front_tag(&self) -> Option<i64> {
        self.front().map(|cell| cell.tag)
    }

    fn pop_front(&mut self) {
        self.dequeue();
    }
}
