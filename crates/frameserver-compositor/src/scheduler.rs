//! Presentation Scheduler (C8).
//!
//! Runs once per compositor tick, per source: the skip/present policy for
//! queued (decoded-stream) kinds, audio/video clock reconciliation,
//! prewake sleep computation, and the rollback window for interactive
//! cores with savestate support. All inputs are plain values (no access to
//! the shared page or frame queue types) so the policy itself is testable
//! without a real transport.

use frameserver_sources::{ClockState, PacingParams, MAX_ROLLBACK_SLOTS};

/// The front-of-queue access [`poll`] needs, abstracted so the skip policy
/// stays testable without depending on [`crate::frame_queue::FrameQueue`]
/// directly (and so a single queue only needs a single mutable borrow,
/// rather than two aliasing closures).
pub trait FrontQueue {
    /// The PTS tag of the current front cell, if any.
    fn front_tag(&self) -> Option<i64>;
    /// Drops the current front cell.
    fn pop_front(&mut self);
}

/// Outcome of [`poll`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// A frame is ready to render this tick.
    GotFrame,
    /// No frame is presentable yet; revisit next tick.
    NoFrame,
}

/// Drops every front-of-queue cell whose tag is older than
/// `now - vskipthresh`, recording the last dropped tag into
/// `clocks.last_pts` so the audio clock keeps moving even when video is
/// starved (base spec §4.8 step 2). `front_tag` is re-read by the caller
/// via `peek_front` after each drop since this function only decides
/// whether to drop, not how the queue is mutated.
pub fn should_drop(front_tag: i64, now_ms: i64, vskipthresh_ms: i64) -> bool {
    now_ms - front_tag > vskipthresh_ms
}

/// After stale cells are drained, decides whether the new front cell is
/// presentable this tick (base spec §4.8 step 3): `|tag - now| < vskipthresh`.
pub fn is_presentable(front_tag: i64, now_ms: i64, vskipthresh_ms: i64) -> bool {
    (front_tag - now_ms).abs() < vskipthresh_ms
}

/// Runs the full skip policy against `queue`. Returns
/// [`PollOutcome::GotFrame`] once a presentable cell is at the front,
/// updating `clocks.last_pts` on every drop and on the final presentable
/// cell, exactly mirroring the original `arcan_frameserver_videoframe`'s
/// `ffunc_poll` loop.
pub fn poll(
    clocks: &mut ClockState,
    pacing: &PacingParams,
    now_ms: i64,
    queue: &mut impl FrontQueue,
) -> PollOutcome {
    while let Some(tag) = queue.front_tag() {
        if should_drop(tag, now_ms, pacing.vskipthresh_ms) {
            clocks.last_pts = tag;
            queue.pop_front();
            continue;
        }
        break;
    }

    match queue.front_tag() {
        Some(tag) if is_presentable(tag, now_ms, pacing.vskipthresh_ms) => {
            clocks.last_pts = tag;
            PollOutcome::GotFrame
        }
        _ => PollOutcome::NoFrame,
    }
}

/// Outcome of [`reconcile_audio`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioDecision {
    /// Submit this audio cell to the mixer.
    Submit,
    /// Drop it; video cadence is privileged over audio continuity (base
    /// spec §4.8).
    Drop,
}

/// Audio/video clock reconciliation (base spec §4.8, §8 invariant 5):
/// advances `clocks.audio_clock` by `bpms * buffer_bytes` and decides
/// whether to submit or drop based on drift against `clocks.last_pts`.
/// Drift is measured *before* advancing the clock, matching the original's
/// `dc = lastpts - audioclock; audioclock += bpms * buffers`.
pub fn reconcile_audio(
    clocks: &mut ClockState,
    drift_budget_ms: i64,
    buffer_bytes: usize,
) -> AudioDecision {
    let drift = clocks.last_pts as f64 - clocks.audio_clock;
    clocks.audio_clock += clocks.bpms * buffer_bytes as f64;

    if drift < drift_budget_ms as f64 {
        AudioDecision::Submit
    } else {
        AudioDecision::Drop
    }
}

/// Outcome of [`prewake`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrewakeDecision {
    /// Sleep for this many milliseconds before the next scheduled action.
    Sleep(u64),
    /// The deadline is inside the prewake budget; busy-advance instead of
    /// sleeping.
    BusyAdvance,
}

/// Base spec §4.8's prewake heuristic: if the time remaining until the
/// next frame's deadline exceeds `prewake_ms`, sleep for
/// `time_left - prewake_ms`; otherwise busy-advance to avoid oversleeping
/// past a close deadline.
pub fn prewake(time_left_ms: i64, prewake_ms: i64) -> PrewakeDecision {
    if time_left_ms > prewake_ms {
        PrewakeDecision::Sleep((time_left_ms - prewake_ms) as u64)
    } else {
        PrewakeDecision::BusyAdvance
    }
}

/// Checks whether `observed_now_ms` has deviated from the scheduler's
/// expected clock (`expected_now_ms`) by more than
/// `pacing.timing_reset_threshold_ms` worth; if `debug_disable` is unset
/// and the deviation exceeds the threshold, rebases `clocks` and returns
/// `true` (base spec §4.8's "deviation >200ms triggers a timing reset
/// unless a debug env disables it").
pub fn maybe_reset_timing(
    clocks: &mut ClockState,
    observed_now_ms: i64,
    expected_now_ms: i64,
    threshold_ms: i64,
    debug_disable: bool,
) -> bool {
    if debug_disable {
        return false;
    }
    if (observed_now_ms - expected_now_ms).abs() > threshold_ms {
        clocks.rebase();
        true
    } else {
        false
    }
}

/// Rollback window for interactive sources with savestate support (base
/// spec §4.8). `N = |skipmode - ROLLBACK| + 1`, capped at
/// [`MAX_ROLLBACK_SLOTS`]; `skipmode <= ROLLBACK` (passed here as
/// `rollback_frames > 0`) is the only configuration this scheduler drives,
/// matching base spec's documented behavior exactly (not the broader,
/// partially-dead `skipmode` space noted as an open question in base spec
/// §9).
pub struct RollbackWindow {
    slots: Vec<Vec<u8>>,
    capacity: usize,
    next: usize,
    filled: usize,
}

impl RollbackWindow {
    /// `rollback_frames` is the raw `|skipmode - ROLLBACK| + 1` value
    /// before capping.
    pub fn new(rollback_frames: u32) -> Self {
        let capacity = (rollback_frames.max(1) as usize).min(MAX_ROLLBACK_SLOTS as usize);
        RollbackWindow {
            slots: Vec::with_capacity(capacity),
            capacity,
            next: 0,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Serializes `state` into the ring, overwriting the oldest slot once
    /// full — the "every frame is serialised into a ring of N savestate
    /// slots" step of base spec §4.8.
    pub fn push(&mut self, state: Vec<u8>) {
        if self.slots.len() < self.capacity {
            self.slots.push(state);
        } else {
            self.slots[self.next] = state;
        }
        self.next = (self.next + 1) % self.capacity;
        self.filled = (self.filled + 1).min(self.capacity);
    }

    /// Retrieves the oldest retained savestate, used to restart the
    /// deterministic re-simulation on dirty input. Returns `None` if the
    /// window hasn't filled at least one slot yet.
    pub fn oldest(&self) -> Option<&[u8]> {
        if self.filled == 0 {
            return None;
        }
        let oldest_index = if self.filled < self.capacity {
            0
        } else {
            self.next
        };
        self.slots.get(oldest_index).map(Vec::as_slice)
    }

    /// Number of frames that must be re-simulated with video skipped
    /// before the final, visible frame — `N - 1` from base spec §4.8.
    pub fn replay_frames(&self) -> usize {
        self.capacity.saturating_sub(1)
    }
}
