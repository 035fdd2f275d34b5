//! Per-source record (base spec §3, §4.6) — everything source control
//! owns about one connection, independent of the frame queues and
//! scheduler that sit a layer up in `frameserver-compositor`.

use crate::audio_staging::AudioStaging;
use crate::config::FrameserverConfig;
use crate::error::SourceResult;
use crate::kind::{SourceFlags, SourceKind};
use crate::playstate::Playstate;
use std::time::Instant;

/// Identity fields base spec §3 lists for a per-source record: the video
/// and audio object ids the compositor's AV pipeline already uses, plus an
/// opaque tag the scripting layer attaches at spawn time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceIdentity {
    pub source_id: u32,
    pub video_id: u32,
    pub audio_id: u32,
    pub user_tag: u64,
}

/// Pacing parameters for the presentation scheduler (base spec §3, §4.8).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PacingParams {
    pub ms_per_frame: f64,
    pub vskipthresh_ms: i64,
    pub prewake_ms: i64,
    pub presilence_ms: u32,
}

impl PacingParams {
    /// Derives pacing parameters from the process-wide config and a
    /// producer-declared frame rate.
    pub fn from_config(config: &FrameserverConfig, frames_per_second: f64) -> Self {
        let ms_per_frame = if frames_per_second > 0.0 {
            1000.0 / frames_per_second
        } else {
            0.0
        };
        PacingParams {
            ms_per_frame,
            vskipthresh_ms: config.vskipthresh_ms,
            prewake_ms: config.prewake_ms,
            presilence_ms: config.presilence_ms,
        }
    }
}

/// Wall-clock anchors tracked per source (base spec §3): when the source
/// was spawned, when it started producing, the last presented/dropped
/// video PTS, and the running audio clock used for A/V reconciliation
/// (base spec §4.8).
#[derive(Debug)]
pub struct ClockState {
    pub launched_at: Instant,
    pub started_at: Instant,
    pub last_pts: i64,
    pub audio_clock: f64,
    /// Bytes-to-milliseconds rate for audio clock advancement:
    /// `1000 / sample_rate / channels * 0.5` (base spec §4.8).
    pub bpms: f64,
}

impl ClockState {
    pub fn new(sample_rate: u32, channels: u32) -> Self {
        let now = Instant::now();
        let bpms = if sample_rate > 0 && channels > 0 {
            (1000.0 / sample_rate as f64) / channels as f64 * 0.5
        } else {
            0.0
        };
        ClockState {
            launched_at: now,
            started_at: now,
            last_pts: 0,
            audio_clock: 0.0,
            bpms,
        }
    }

    /// Rebase `started_at` to now and reset `last_pts`/`audio_clock`. Used
    /// by the scheduler's timing-reset path (base spec §4.8) when a
    /// deviation exceeds the configured threshold.
    pub fn rebase(&mut self) {
        self.started_at = Instant::now();
        self.last_pts = 0;
        self.audio_clock = 0.0;
    }

    /// Elapsed time since this source was spawned, used by the respawn
    /// debounce (base spec §4.4).
    pub fn uptime(&self) -> std::time::Duration {
        self.launched_at.elapsed()
    }
}

/// Everything per-source state the parent keeps outside the shared page
/// itself (base spec §3's "per-source record"). Owns the audio staging
/// buffer directly; frame queues are held by the compositor-side wrapper
/// that embeds this record, since `frameserver-sources` doesn't depend on
/// `frameserver-compositor`.
pub struct SourceRecord {
    pub identity: SourceIdentity,
    pub kind: SourceKind,
    pub flags: SourceFlags,
    playstate: Playstate,
    pub clocks: ClockState,
    pub pacing: PacingParams,
    pub audio_staging: AudioStaging,
}

impl SourceRecord {
    /// Constructs a new record at spawn time, in the `Initializing`
    /// playstate (or `Playing` immediately if `flags.autoplay` is set —
    /// base spec §3's `autoplay` flag).
    pub fn new(
        identity: SourceIdentity,
        kind: SourceKind,
        flags: SourceFlags,
        pacing: PacingParams,
        audio_buffer_capacity: usize,
        sample_rate: u32,
        channels: u32,
    ) -> Self {
        let playstate = if flags.autoplay {
            Playstate::Playing
        } else {
            Playstate::Initializing
        };
        SourceRecord {
            identity,
            kind,
            flags,
            playstate,
            clocks: ClockState::new(sample_rate, channels),
            pacing,
            audio_staging: AudioStaging::new(audio_buffer_capacity),
        }
    }

    pub fn playstate(&self) -> Playstate {
        self.playstate
    }

    /// Applies a validated playstate transition, rejecting anything base
    /// spec §7 classifies as an invalid-state operation.
    pub fn set_playstate(&mut self, to: Playstate) -> SourceResult<()> {
        self.playstate = self.playstate.transition(to)?;
        Ok(())
    }

    /// True once the source has left `Initializing` and its uptime exceeds
    /// the handshake window — used by the decoded-stream PTS pacing to
    /// know `started_at` is meaningful.
    pub fn is_active(&self) -> bool {
        matches!(self.playstate, Playstate::Playing)
    }
}
