//! Source Control (C6): per-source record, kind, playstate, lifecycle, and
//! respawn policy.
//!
//! Sits above `frameserver-transport` and `frameserver-proto`. The frame
//! queues (C7), presentation scheduler (C8), and feed functions (C9) that
//! actually drive a source's per-tick behavior live one layer up in
//! `frameserver-compositor`, which embeds a [`SourceRecord`] per source.

mod audio_staging;
mod config;
mod error;
mod kind;
mod lifecycle;
mod playstate;
mod record;

pub use audio_staging::AudioStaging;
pub use config::{
    FrameserverConfig, FrameserverConfigBuilder, DEFAULT_AUDIO_QUEUE_CAPACITY,
    DEFAULT_AV_DRIFT_BUDGET_MS, DEFAULT_FAIRNESS_FRACTION, DEFAULT_GUARD_PERIOD,
    DEFAULT_PREWAKE_MS, DEFAULT_RESPAWN_GRACE, DEFAULT_TIMING_RESET_THRESHOLD_MS,
    DEFAULT_VIDEO_QUEUE_CAPACITY, DEFAULT_VSKIPTHRESH_MS, MAX_ROLLBACK_SLOTS,
};
pub use error::{SourceError, SourceResult};
pub use kind::{GlUploadHint, SourceFlags, SourceKind};
pub use lifecycle::{decide, RespawnDecision};
pub use playstate::Playstate;
pub use record::{ClockState, PacingParams, SourceIdentity, SourceRecord};
