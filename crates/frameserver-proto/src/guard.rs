//! Guard Thread (C4).
//!
//! One long-running thread per source on the parent side, and a symmetric
//! thread on the child side. Every 25-100ms it runs `integrity_check`,
//! checks liveness of the peer process, and — if either fails and the
//! source has existed more than a second — clears `dms`, posts all three
//! semaphores to unblock any waiters, and reports the terminal condition to
//! the caller so it can emit a TERMINATED event and rebind the source's
//! feed to the no-op dummy feed. The one-second grace prevents rapid
//! fork-bomb relaunch loops on broken spawns.

use frameserver_transport::SharedPage;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

/// Which side of the connection a [`GuardThread`] is running on; determines
/// whose pid it checks liveness against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// Runs on the parent, checks the child pid stored in the header.
    Parent,
    /// Runs on the child, checks the parent pid stored in the header.
    Child,
}

/// Why a guard tick concluded the peer is gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalReason {
    /// `integrity_check` failed: cookie, version, or bounds mismatch.
    Corruption,
    /// The peer's process handle no longer resolves to a live process.
    Liveness,
}

/// Liveness probe abstraction so tests can fake process death without
/// spawning a real child. Production callers use [`os_process_alive`].
pub trait LivenessProbe {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Checks process liveness via `kill(pid, 0)` semantics: on Unix this is a
/// signal-0 probe; this crate targets native OS subprocesses only, so no
/// wasm32 fallback is needed here (mirrors the transport crate's stance).
pub struct OsLivenessProbe;

impl LivenessProbe for OsLivenessProbe {
    #[cfg(unix)]
    fn is_alive(&self, pid: u32) -> bool {
        if pid == 0 {
            return false;
        }
        // SAFETY: signal 0 performs no action beyond existence/permission
        // checks; `pid` is read from the shared page as a plain integer.
        let result = unsafe { libc_kill(pid as i32, 0) };
        result == 0
    }

    #[cfg(not(unix))]
    fn is_alive(&self, pid: u32) -> bool {
        pid != 0
    }
}

#[cfg(unix)]
extern "C" {
    #[link_name = "kill"]
    fn libc_kill(pid: i32, sig: i32) -> i32;
}

/// The guard thread's per-tick state machine. Owns the elapsed-since-spawn
/// clock that implements the one-second grace period; does not own a
/// `std::thread::JoinHandle` itself, since `frameserver-sources` decides how
/// (and on which executor) to drive `tick` repeatedly.
pub struct GuardThread {
    side: Side,
    spawned_at: Instant,
    period: Duration,
}

impl GuardThread {
    /// Constructs a guard for a source spawned just now, polling at
    /// `period` (base spec §4.4's 25-100ms window).
    pub fn new(side: Side, period: Duration) -> Self {
        GuardThread {
            side,
            spawned_at: Instant::now(),
            period,
        }
    }

    /// The configured poll period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs one guard check. Returns `Some(reason)` once both the failure
    /// condition and the one-second grace have been satisfied, at which
    /// point the caller must treat the source as terminal: this function
    /// has already cleared `dms` and posted all three semaphores by the
    /// time it returns `Some`.
    pub fn tick(&self, page: &SharedPage, probe: &dyn LivenessProbe) -> Option<TerminalReason> {
        let integrity_failed = page.integrity_check().is_err();
        let liveness_failed = !self.peer_alive(page, probe);

        if !integrity_failed && !liveness_failed {
            return None;
        }

        if self.spawned_at.elapsed() < Duration::from_secs(1) {
            return None;
        }

        let reason = if integrity_failed {
            TerminalReason::Corruption
        } else {
            TerminalReason::Liveness
        };

        page.header().dms.store(0, Ordering::Release);
        page.header().semaphores.post_all_and_wake();
        Some(reason)
    }

    fn peer_alive(&self, page: &SharedPage, probe: &dyn LivenessProbe) -> bool {
        let header = page.header();
        let peer_pid = match self.side {
            Side::Parent => header.child_pid.load(Ordering::Acquire),
            Side::Child => header.parent_pid.load(Ordering::Acquire),
        };
        // A child pid of 0 means the child hasn't registered itself with
        // the page yet (handshake still in flight); not yet a liveness
        // failure from the parent's point of view.
        if self.side == Side::Parent && peer_pid == 0 {
            return true;
        }
        probe.is_alive(peer_pid)
    }
}
