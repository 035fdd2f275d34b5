//! Process-wide defaults (REDESIGN FLAG: "Global/module state").
//!
//! Base spec's `queueopts`/default-context globals become one explicit
//! record built once via a builder and threaded into `spawn`, never mutable
//! process-wide state. Mirrors `hub::ServicesHubBuilder`'s shape: optional
//! fields with setters, a `build` that fills in defaults for anything
//! unset.

use std::time::Duration;

/// Default video frame queue capacity (base spec §4.7).
pub const DEFAULT_VIDEO_QUEUE_CAPACITY: usize = 8;
/// Default audio frame queue capacity (base spec §4.7).
pub const DEFAULT_AUDIO_QUEUE_CAPACITY: usize = 12;
/// Default video skip threshold in milliseconds (base spec §4.8).
pub const DEFAULT_VSKIPTHRESH_MS: i64 = 60;
/// Default scheduler prewake budget in milliseconds (base spec §4.8).
pub const DEFAULT_PREWAKE_MS: i64 = 10;
/// Default audio/video drift budget before an audio cell is dropped
/// (base spec §4.8, §8 invariant 5).
pub const DEFAULT_AV_DRIFT_BUDGET_MS: i64 = 60;
/// Default guard thread poll period (base spec §4.4's 25-100ms window).
pub const DEFAULT_GUARD_PERIOD: Duration = Duration::from_millis(50);
/// Default event-transfer fairness fraction (base spec §4.3).
pub const DEFAULT_FAIRNESS_FRACTION: f32 = 0.5;
/// Grace period before a dead child/parent is treated as terminal or
/// loop-respawned (base spec §4.4, §4.6).
pub const DEFAULT_RESPAWN_GRACE: Duration = Duration::from_secs(1);
/// Timing deviation that triggers a timing reset unless debug-disabled
/// (base spec §4.8).
pub const DEFAULT_TIMING_RESET_THRESHOLD_MS: i64 = 200;
/// Maximum rollback savestate slots (base spec §4.8).
pub const MAX_ROLLBACK_SLOTS: u32 = 10;

/// Process-wide configuration for the frameserver core, built once per
/// compositor process and passed explicitly to every `spawn` call. Replaces
/// the original's mutable global `queueopts`/default-context pair.
#[derive(Clone, Debug)]
pub struct FrameserverConfig {
    pub video_queue_capacity: usize,
    pub audio_queue_capacity: usize,
    pub vskipthresh_ms: i64,
    pub prewake_ms: i64,
    pub av_drift_budget_ms: i64,
    pub guard_period: Duration,
    pub fairness_fraction: f32,
    pub respawn_grace: Duration,
    pub timing_reset_threshold_ms: i64,
    pub legacy_audio_buffer: bool,
    pub presilence_ms: u32,
    /// Disables the timing reset on large deviations, mirroring
    /// `ARCAN_FRAMESERVER_DEBUGSTALL`.
    pub debug_disable_timing_reset: bool,
}

impl FrameserverConfig {
    /// Starts a builder seeded with the base spec's documented defaults.
    pub fn builder() -> FrameserverConfigBuilder {
        FrameserverConfigBuilder::new()
    }
}

impl Default for FrameserverConfig {
    fn default() -> Self {
        FrameserverConfigBuilder::new().build()
    }
}

/// Builder for [`FrameserverConfig`]. Every setter is optional; `build`
/// fills in the base spec's documented default for anything left unset.
#[derive(Clone, Debug, Default)]
pub struct FrameserverConfigBuilder {
    video_queue_capacity: Option<usize>,
    audio_queue_capacity: Option<usize>,
    vskipthresh_ms: Option<i64>,
    prewake_ms: Option<i64>,
    av_drift_budget_ms: Option<i64>,
    guard_period: Option<Duration>,
    fairness_fraction: Option<f32>,
    respawn_grace: Option<Duration>,
    timing_reset_threshold_ms: Option<i64>,
    legacy_audio_buffer: Option<bool>,
    presilence_ms: Option<u32>,
    debug_disable_timing_reset: Option<bool>,
}

impl FrameserverConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn video_queue_capacity(mut self, value: usize) -> Self {
        self.video_queue_capacity = Some(value);
        self
    }

    pub fn audio_queue_capacity(mut self, value: usize) -> Self {
        self.audio_queue_capacity = Some(value);
        self
    }

    pub fn vskipthresh_ms(mut self, value: i64) -> Self {
        self.vskipthresh_ms = Some(value);
        self
    }

    pub fn prewake_ms(mut self, value: i64) -> Self {
        self.prewake_ms = Some(value);
        self
    }

    pub fn av_drift_budget_ms(mut self, value: i64) -> Self {
        self.av_drift_budget_ms = Some(value);
        self
    }

    pub fn guard_period(mut self, value: Duration) -> Self {
        self.guard_period = Some(value);
        self
    }

    pub fn fairness_fraction(mut self, value: f32) -> Self {
        self.fairness_fraction = Some(value);
        self
    }

    pub fn respawn_grace(mut self, value: Duration) -> Self {
        self.respawn_grace = Some(value);
        self
    }

    pub fn timing_reset_threshold_ms(mut self, value: i64) -> Self {
        self.timing_reset_threshold_ms = Some(value);
        self
    }

    /// Selects the ~288 KiB legacy audio buffer size instead of the ~64
    /// KiB modern default (base spec §6, `GAME_ABUFSZ`).
    pub fn legacy_audio_buffer(mut self, value: bool) -> Self {
        self.legacy_audio_buffer = Some(value);
        self
    }

    pub fn presilence_ms(mut self, value: u32) -> Self {
        self.presilence_ms = Some(value);
        self
    }

    /// Mirrors `ARCAN_FRAMESERVER_DEBUGSTALL`: when true, a timing
    /// deviation past `timing_reset_threshold_ms` never triggers a reset.
    pub fn debug_disable_timing_reset(mut self, value: bool) -> Self {
        self.debug_disable_timing_reset = Some(value);
        self
    }

    pub fn build(self) -> FrameserverConfig {
        FrameserverConfig {
            video_queue_capacity: self
                .video_queue_capacity
                .unwrap_or(DEFAULT_VIDEO_QUEUE_CAPACITY),
            audio_queue_capacity: self
                .audio_queue_capacity
                .unwrap_or(DEFAULT_AUDIO_QUEUE_CAPACITY),
            vskipthresh_ms: self.vskipthresh_ms.unwrap_or(DEFAULT_VSKIPTHRESH_MS),
            prewake_ms: self.prewake_ms.unwrap_or(DEFAULT_PREWAKE_MS),
            av_drift_budget_ms: self
                .av_drift_budget_ms
                .unwrap_or(DEFAULT_AV_DRIFT_BUDGET_MS),
            guard_period: self.guard_period.unwrap_or(DEFAULT_GUARD_PERIOD),
            fairness_fraction: self
                .fairness_fraction
                .unwrap_or(DEFAULT_FAIRNESS_FRACTION),
            respawn_grace: self.respawn_grace.unwrap_or(DEFAULT_RESPAWN_GRACE),
            timing_reset_threshold_ms: self
                .timing_reset_threshold_ms
                .unwrap_or(DEFAULT_TIMING_RESET_THRESHOLD_MS),
            legacy_audio_buffer: self.legacy_audio_buffer.unwrap_or(false),
            presilence_ms: self.presilence_ms.unwrap_or(0),
            debug_disable_timing_reset: self.debug_disable_timing_reset.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = FrameserverConfig::default();
        assert_eq!(config.video_queue_capacity, DEFAULT_VIDEO_QUEUE_CAPACITY);
        assert_eq!(config.audio_queue_capacity, DEFAULT_AUDIO_QUEUE_CAPACITY);
        assert_eq!(config.vskipthresh_ms, 60);
        assert_eq!(config.fairness_fraction, 0.5);
        assert!(!config.legacy_audio_buffer);
    }

    #[test]
    fn builder_overrides_only_touched_fields() {
        let config = FrameserverConfig::builder()
            .vskipthresh_ms(100)
            .legacy_audio_buffer(true)
            .build();
        assert_eq!(config.vskipthresh_ms, 100);
        assert!(config.legacy_audio_buffer);
        assert_eq!(config.prewake_ms, DEFAULT_PREWAKE_MS);
    }
}
