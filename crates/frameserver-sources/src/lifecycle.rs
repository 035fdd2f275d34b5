//! Respawn policy (base spec §4.4, §4.6, §8 scenarios 4-5).
//!
//! A child's exit is reported to source control alongside how long the
//! source has existed. `decide` is the single place that turns
//! `(loop_playback, uptime, exit_code)` into a respawn-or-terminate
//! decision, shared by both the "clean exit" and "guard-detected liveness
//! failure" paths so the one-second debounce logic only lives once.

use std::time::Duration;

/// Outcome of [`decide`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RespawnDecision {
    /// Emit LOOPED and respawn with the same resource.
    Respawn,
    /// Emit TERMINATED and rebind the feed to the no-op dummy feed.
    Terminate,
}

/// Decides whether a source should respawn or terminate after its child
/// exited (cleanly, with `exit_code`, or via a guard-detected liveness
/// failure when `exit_code` is `None`).
///
/// The one-second grace (base spec §4.4) applies uniformly: an uptime
/// under `grace` always terminates, even with `loop_playback` set, to
/// prevent a fork-bomb relaunch loop on a broken spawn.
pub fn decide(loop_playback: bool, uptime: Duration, grace: Duration) -> RespawnDecision {
    if loop_playback && uptime >= grace {
        RespawnDecision::Respawn
    } else {
        RespawnDecision::Terminate
    }
}
