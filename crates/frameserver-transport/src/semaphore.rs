//! Semaphore Set (C2).
//!
//! Three counting semaphores — video, audio, event — are embedded directly
//! in the page header as `AtomicU32` words rather than opened as named OS
//! objects (`sem_open("<key>v")`/`.../"a"`/`.../"e"`). The page itself is
//! already the one named, shared mapping both processes reach by the same
//! key (see `frameserver-proto`'s handshake), so a second kernel object
//! would only duplicate state that already crosses the process boundary.
//! Wait/post/timeout semantics match the named-semaphore contract exactly:
//! `wait(-1)` blocks, `wait(0)` polls, `wait(n)` sleeps with a ceiling of
//! `n` milliseconds, and `post` always succeeds.
//!
//! Who posts what is fixed by convention, not enforced by the type: the
//! child posts V after writing a frame and the parent posts V after
//! consuming it (symmetric for A), and whichever side enqueues an event
//! posts E so the other side wakes and drains its incoming ring.

use crate::wait::{self, WaitResult};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// A sentinel meaning "block forever" when passed to [`Semaphore::wait`].
pub const WAIT_BLOCK: i32 = -1;
/// A sentinel meaning "poll, don't block" when passed to [`Semaphore::wait`].
pub const WAIT_POLL: i32 = 0;

/// Outcome of a [`Semaphore::wait`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The count was successfully decremented.
    Acquired,
    /// The timeout elapsed before the count became nonzero.
    TimedOut,
}

/// A single counting semaphore backed by an `AtomicU32` embedded in the
/// shared page. Never owns the atomic; always borrows it from the page so
/// that both processes operate on the same memory.
#[repr(transparent)]
pub struct Semaphore {
    count: AtomicU32,
}

impl Semaphore {
    /// Constructs a semaphore in-place over an already-zeroed atomic word.
    /// Used only when laying out the page header; callers otherwise borrow
    /// an existing `Semaphore` reference via [`SemaphoreSet`].
    pub const fn new() -> Self {
        Semaphore {
            count: AtomicU32::new(0),
        }
    }

    /// Increments the count and wakes at most one waiter.
    pub fn post(&self) {
        self.count.fetch_add(1, Ordering::Release);
        wait::wake_one(&self.count);
    }

    /// Wakes every waiter without changing the count. Used by the guard
    /// thread's teardown path, which must unblock a blocking `wait(-1)` and
    /// any timed waiter in the same pass.
    pub fn wake_all(&self) {
        wait::wake_all(&self.count);
    }

    /// Attempts to decrement the count, blocking per `timeout_ms`:
    /// `-1` blocks until a post arrives, `0` polls once without blocking,
    /// and any positive value sleeps with that many milliseconds as a
    /// ceiling.
    ///
    /// A blocking wait (`-1`) parks on [`wait::wait_u32`] directly, which
    /// only returns on a matching wake — there is no deadline to honor. A
    /// timed wait instead parks through [`wait::wait_u32_timeout`], which
    /// bounds each park to the time remaining until the deadline; without
    /// that bound, `atomic_wait::wait`'s lack of a timeout parameter would
    /// mean a positive `timeout_ms` could still block forever.
    pub fn wait(&self, timeout_ms: i32) -> WaitOutcome {
        if timeout_ms == WAIT_POLL {
            return self.try_acquire_once();
        }

        if timeout_ms == WAIT_BLOCK {
            loop {
                if let WaitOutcome::Acquired = self.try_acquire_once() {
                    return WaitOutcome::Acquired;
                }

                let observed = self.count.load(Ordering::Acquire);
                if observed != 0 {
                    // A post landed between the failed CAS and this load;
                    // loop back around to retry the acquire immediately.
                    continue;
                }

                wait::wait_u32(&self.count, 0);
            }
        }

        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);

        loop {
            if let WaitOutcome::Acquired = self.try_acquire_once() {
                return WaitOutcome::Acquired;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return WaitOutcome::TimedOut;
            }

            let observed = self.count.load(Ordering::Acquire);
            if observed != 0 {
                continue;
            }

            match wait::wait_u32_timeout(&self.count, 0, remaining) {
                WaitResult::Ok | WaitResult::NotEqual | WaitResult::TimedOut => {}
            }
        }
    }

    fn try_acquire_once(&self) -> WaitOutcome {
        let mut current = self.count.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return WaitOutcome::TimedOut;
            }
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return WaitOutcome::Acquired,
                Err(observed) => current = observed,
            }
        }
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

/// The three semaphores embedded in the page header: video, audio, event.
#[repr(C)]
pub struct SemaphoreSet {
    /// Posted by the writer of a video frame, consumed by the reader.
    pub video: Semaphore,
    /// Posted by the writer of an audio chunk, consumed by the reader.
    pub audio: Semaphore,
    /// Posted by whichever side enqueues an event.
    pub event: Semaphore,
}

impl SemaphoreSet {
    /// Constructs a fresh, all-zero semaphore set.
    pub const fn new() -> Self {
        SemaphoreSet {
            video: Semaphore::new(),
            audio: Semaphore::new(),
            event: Semaphore::new(),
        }
    }

    /// Posts all three semaphores and wakes every waiter on each. Used by
    /// the guard thread's terminal teardown path so a blocking waiter on
    /// any of the three is unblocked in the same pass.
    pub fn post_all_and_wake(&self) {
        self.video.post();
        self.video.wake_all();
        self.audio.post();
        self.audio.wake_all();
        self.event.post();
        self.event.wake_all();
    }
}

impl Default for SemaphoreSet {
    fn default() -> Self {
        Self::new()
    }
}
