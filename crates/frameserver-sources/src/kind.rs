//! Source kind (base spec §4.6) and its kind-specific flags.
//!
//! A source's kind is chosen once at spawn and never changes; it
//! parameterizes pacing, queueing, and which feed function
//! (`frameserver-compositor::feed`) drives the source's ticks.

/// GPU upload hint carried through to the direct-video feed function
/// (§3 of the supplemented behaviors in SPEC_FULL.md). The actual GPU
/// upload is an external collaborator; this only selects which path the
/// feed function requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlUploadHint {
    /// Single synchronous texture upload per frame.
    Synchronous,
    /// Streaming upload through a pixel buffer object ring.
    Pbo,
}

/// The four source kinds from base spec §4.6's table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// PTS-driven playback with video+audio queues and frameskip.
    DecodedStream { nopts: bool },
    /// Present-ASAP, no queueing, single-buffer direct upload.
    Interactive {
        use_pbo: GlUploadHint,
        /// Rollback window depth in frames, 0 disables rollback.
        rollback_frames: u32,
    },
    /// Parent pulls video via rendertarget readback; audio is staged then
    /// flushed on the same cadence.
    Recorder,
    /// Event-only; video is never transferred.
    Network,
}

impl SourceKind {
    /// True for kinds whose feed function maintains frame queues (C7).
    pub fn uses_frame_queues(&self) -> bool {
        matches!(self, SourceKind::DecodedStream { .. })
    }

    /// True for kinds that participate in PTS-driven audio/video
    /// reconciliation (base spec §4.8).
    pub fn paces_to_pts(&self) -> bool {
        matches!(self, SourceKind::DecodedStream { nopts: false })
    }

    /// Whether this kind transfers video at all. `Network` sources use the
    /// shared page purely as an event-transport surface (base spec §4.9).
    pub fn transfers_video(&self) -> bool {
        !matches!(self, SourceKind::Network)
    }
}

/// Kind-independent per-source flags (base spec §3's "kind-specific
/// flags": `nopts`, `autoplay`, `loop`, `use_pbo`). `nopts`/`use_pbo` live
/// on [`SourceKind`] itself since they only make sense for specific kinds;
/// `autoplay`/`loop_playback` apply uniformly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SourceFlags {
    /// Start in the `Playing` state immediately rather than
    /// `Initializing`.
    pub autoplay: bool,
    /// Respawn with the same resource on an unclean exit, subject to the
    /// one-second debounce (base spec §4.4, §4.6).
    pub loop_playback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_decoded_stream_without_nopts_paces_to_pts() {
        assert!(SourceKind::DecodedStream { nopts: false }.paces_to_pts());
        assert!(!SourceKind::DecodedStream { nopts: true }.paces_to_pts());
        assert!(!SourceKind::Interactive {
            use_pbo: GlUploadHint::Synchronous,
            rollback_frames: 0
        }
        .paces_to_pts());
    }

    #[test]
    fn network_never_transfers_video() {
        assert!(!SourceKind::Network.transfers_video());
        assert!(SourceKind::Recorder.transfers_video());
    }
}
