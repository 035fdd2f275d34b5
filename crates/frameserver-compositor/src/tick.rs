//! Per-source tick orchestration: wires the guard thread's liveness
//! backstop and the respawn/loop lifecycle decision around [`feed::dispatch`].
//!
//! `feed::dispatch`'s own `Tick` command already drives the resize
//! protocol and drains inbound events (base spec §4.8); this module adds
//! the layer above that: the guard thread's independent integrity/liveness
//! check, and what happens once it fires. Spawning a replacement child
//! process is outside this crate's scope (base spec's external
//! collaborators list) — [`TickReport::Respawn`] tells the caller a new
//! process should be launched and the page re-handshaken; this module
//! never calls `fork`/`exec` itself.

use crate::feed::{self, Command, FeedContext, FeedKind, FeedOutcome};
use frameserver_proto::{Event, FrameserverKind, GuardThread, LivenessProbe, TerminalReason};
use frameserver_sources::{RespawnDecision, SourceError};

/// What the caller should do after [`tick_source`] runs.
#[derive(Debug, PartialEq)]
pub enum TickReport {
    /// Nothing noteworthy; the source is still live.
    Continue,
    /// A resize was negotiated this tick; frame queues have already been
    /// freed by the feed function and should be reallocated at the new
    /// geometry before the next `Poll`.
    Resized { w: u32, h: u32 },
    /// The guard thread declared the source terminal and
    /// `flags.loop_playback` is set: a LOOPED event was emitted, `kind` was
    /// left untouched, and the caller should respawn the child and
    /// re-handshake the page (base spec §8 scenario 4: LOOPED + RESIZED,
    /// never TERMINATED).
    Respawn { reason: TerminalReason },
    /// The guard thread declared the source terminal and looping is not
    /// enabled: a TERMINATED event was emitted and `kind` was rebound to
    /// [`FeedKind::Dummy`] (base spec §8 scenario 5).
    Terminated { reason: TerminalReason },
}

/// Runs one compositor tick for a single source: drives the feed
/// function's `Tick` command, then the guard thread's backstop check.
/// `uptime_ms` is the source's elapsed time since spawn, used by the
/// respawn debounce (base spec §4.4).
pub fn tick_source(
    kind: &mut FeedKind,
    ctx: &mut FeedContext<'_>,
    guard: &GuardThread,
    probe: &dyn LivenessProbe,
    now_ms: i64,
    respawn_grace: std::time::Duration,
) -> Result<TickReport, SourceError> {
    let resized = match feed::dispatch(kind, Command::Tick { now_ms }, ctx)? {
        FeedOutcome::Resized { w, h } => Some((w, h)),
        _ => None,
    };

    let Some(reason) = guard.tick(ctx.page, probe) else {
        return Ok(match resized {
            Some((w, h)) => TickReport::Resized { w, h },
            None => TickReport::Continue,
        });
    };

    let decision = frameserver_sources::decide(
        ctx.record.flags.loop_playback,
        ctx.record.clocks.uptime(),
        respawn_grace,
    );

    match decision {
        RespawnDecision::Respawn => {
            ctx.events.emit(
                ctx.record.identity.source_id,
                Event::Frameserver(FrameserverKind::Looped),
            );
            Ok(TickReport::Respawn { reason })
        }
        RespawnDecision::Terminate => {
            let _ = ctx.record.set_playstate(frameserver_sources::Playstate::Terminated);
            *kind = FeedKind::Dummy;
            ctx.events.emit(
                ctx.record.identity.source_id,
                Event::Frameserver(FrameserverKind::Terminated),
            );
            Ok(TickReport::Terminated { reason })
        }
    }
}
