//! Shared construction helpers for the scenario tests in this crate.

use frameserver_sources::{
    GlUploadHint, PacingParams, SourceFlags, SourceIdentity, SourceKind, SourceRecord,
};
use frameserver_transport::AUDIO_BUFFER_DEFAULT;

pub fn pacing(vskipthresh_ms: i64) -> PacingParams {
    PacingParams {
        ms_per_frame: 16.0,
        vskipthresh_ms,
        prewake_ms: 10,
        presilence_ms: 0,
    }
}

pub fn interactive_record(loop_playback: bool) -> SourceRecord {
    SourceRecord::new(
        SourceIdentity {
            source_id: 9,
            video_id: 9,
            audio_id: 9,
            user_tag: 0,
        },
        SourceKind::Interactive {
            use_pbo: GlUploadHint::Synchronous,
            rollback_frames: 0,
        },
        SourceFlags {
            autoplay: true,
            loop_playback,
        },
        pacing(60),
        AUDIO_BUFFER_DEFAULT,
        48_000,
        2,
    )
}

pub fn decoded_stream_record() -> SourceRecord {
    SourceRecord::new(
        SourceIdentity {
            source_id: 3,
            video_id: 3,
            audio_id: 3,
            user_tag: 0,
        },
        SourceKind::DecodedStream { nopts: true },
        SourceFlags {
            autoplay: true,
            loop_playback: false,
        },
        pacing(60),
        AUDIO_BUFFER_DEFAULT,
        48_000,
        2,
    )
}

pub fn network_record() -> SourceRecord {
    SourceRecord::new(
        SourceIdentity {
            source_id: 5,
            video_id: 0,
            audio_id: 0,
            user_tag: 0,
        },
        SourceKind::Network,
        SourceFlags::default(),
        pacing(60),
        AUDIO_BUFFER_DEFAULT,
        48_000,
        2,
    )
}

pub fn unique_key(tag: &str) -> String {
    format!("test-{tag}-{}-{}", std::process::id(), thread_salt())
}

/// Cheap per-call salt so parallel `#[test]` threads in the same process
/// don't collide on the same connection key.
fn thread_salt() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
