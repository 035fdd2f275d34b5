//! Futex-backed wait/notify shim used to back the semaphore set (C2) and the
//! event/frame rings' consumer-side parking.
//!
//! Named POSIX semaphores (`sem_open`/`sem_wait`/`sem_post`) would duplicate
//! synchronization state that already lives in the shared page, since the
//! page itself is the one named, shared object both processes map. Instead
//! every word a semaphore wait parks on lives in [`crate::page::PageHeader`]
//! and is woken through this shim, which wraps the `atomic-wait` crate
//! (futex on Linux, equivalent primitives elsewhere).

#[cfg(feature = "loom")]
use loom::sync::atomic::{AtomicU32, Ordering};
#[cfg(not(feature = "loom"))]
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Outcome of a single futex wait attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitResult {
    /// The atomic was woken by a notify after matching `expected`.
    Ok,
    /// The atomic no longer matched `expected` by the time the wait ran.
    NotEqual,
    /// The caller-supplied budget elapsed before either of the above.
    TimedOut,
}

#[cfg(feature = "loom")]
mod imp {
    use super::{AtomicU32, WaitResult};

    #[inline]
    pub(crate) fn wait_u32(_atomic: &AtomicU32, _expected: u32) -> WaitResult {
        WaitResult::NotEqual
    }

    #[inline]
    pub(crate) fn wake_one(_atomic: &AtomicU32) {}

    #[inline]
    pub(crate) fn wake_all(_atomic: &AtomicU32) {}
}

#[cfg(not(feature = "loom"))]
mod imp {
    use super::{AtomicU32, WaitResult};

    #[inline]
    pub(crate) fn wait_u32(atomic: &AtomicU32, expected: u32) -> WaitResult {
        atomic_wait::wait(atomic, expected);
        WaitResult::Ok
    }

    #[inline]
    pub(crate) fn wake_one(atomic: &AtomicU32) {
        atomic_wait::wake_one(atomic as *const AtomicU32);
    }

    #[inline]
    pub(crate) fn wake_all(atomic: &AtomicU32) {
        atomic_wait::wake_all(atomic as *const AtomicU32);
    }
}

/// Blocks the caller until `atomic` differs from `expected` or a wakeup occurs.
///
/// Spurious wakeups are possible; callers must re-check the condition in a
/// loop, which is exactly how [`crate::semaphore::Semaphore::wait`] uses it.
#[inline]
pub fn wait_u32(atomic: &AtomicU32, expected: u32) -> WaitResult {
    imp::wait_u32(atomic, expected)
}

/// Wakes at most one waiter parked on `atomic`.
#[inline]
pub fn wake_one(atomic: &AtomicU32) {
    imp::wake_one(atomic)
}

/// Wakes every waiter parked on `atomic`. Used by the guard thread's
/// teardown path, which must unblock both a blocking semaphore wait and any
/// timed waiter in the same pass.
#[inline]
pub fn wake_all(atomic: &AtomicU32) {
    imp::wake_all(atomic)
}

/// Upper bound on a single park interval inside [`wait_u32_timeout`].
const POLL_SLICE: Duration = Duration::from_millis(1);

/// Blocks until `atomic` no longer equals `expected`, or until `budget`
/// elapses, whichever comes first.
///
/// `atomic_wait::wait` (what [`wait_u32`] wraps) has no timeout parameter —
/// it parks until a matching `wake`, full stop. A caller with a deadline
/// (a timed semaphore wait, a bounded handshake) cannot park on that
/// primitive directly without risking an indefinite block, so this parks in
/// bounded slices instead, rechecking both the atomic and the clock between
/// each slice.
pub fn wait_u32_timeout(atomic: &AtomicU32, expected: u32, budget: Duration) -> WaitResult {
    let deadline = Instant::now() + budget;
    loop {
        if atomic.load(Ordering::Acquire) != expected {
            return WaitResult::NotEqual;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return WaitResult::TimedOut;
        }
        std::thread::sleep(remaining.min(POLL_SLICE));
    }
}
