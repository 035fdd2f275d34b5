//! Audio staging buffer (base spec §4.6, §5).
//!
//! Sits between the producer callback (copying out of the shared page) and
//! the audio-mixer consumer, which runs on a third thread — the one place
//! in the core where a lock is actually required, since everything else is
//! either SPSC or single-writer. Mirrors `transport-fabric::SharedPort`'s
//! use of `parking_lot::Mutex` around its rings: the critical section is a
//! single memcpy, no nesting, no ordering concerns (DESIGN NOTES, "SDL
//! mutex wrapping memcpy").

use crate::error::SourceError;
use parking_lot::Mutex;

/// A fixed-capacity byte buffer guarded by a mutex, written by the feed
/// function's audio path and drained by the audio mixer.
pub struct AudioStaging {
    inner: Mutex<StagingState>,
}

struct StagingState {
    buffer: Vec<u8>,
    used: usize,
}

impl AudioStaging {
    /// Allocates a staging buffer of `capacity` bytes, matching the
    /// negotiated `abufsize`.
    pub fn new(capacity: usize) -> Self {
        AudioStaging {
            inner: Mutex::new(StagingState {
                buffer: vec![0u8; capacity],
                used: 0,
            }),
        }
    }

    /// Appends `chunk` to the staging buffer. On overflow, resets the
    /// staging offset (dropping whatever was pending) and returns
    /// [`SourceError::AudioStagingOverflow`] — base spec §7's "local,
    /// non-terminal" overflow handling: "reset staging offset, log
    /// warning, drop frame."
    pub fn push(&self, chunk: &[u8]) -> Result<(), SourceError> {
        let mut state = self.inner.lock();
        let capacity = state.buffer.len();
        if state.used + chunk.len() > capacity {
            tracing::warn!(
                attempted = state.used + chunk.len(),
                capacity,
                "audio staging overflow, resetting and dropping"
            );
            state.used = 0;
            return Err(SourceError::AudioStagingOverflow {
                attempted: chunk.len(),
                capacity,
            });
        }
        let start = state.used;
        state.buffer[start..start + chunk.len()].copy_from_slice(chunk);
        state.used += chunk.len();
        Ok(())
    }

    /// Drains everything staged so far into a freshly allocated buffer and
    /// resets the offset, for the audio mixer/recorder flush path to
    /// consume under its own cadence.
    pub fn drain(&self) -> Vec<u8> {
        let mut state = self.inner.lock();
        let drained = state.buffer[..state.used].to_vec();
        state.used = 0;
        drained
    }

    /// Bytes currently staged, awaiting a drain.
    pub fn len(&self) -> usize {
        self.inner.lock().used
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total staging capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.inner.lock().buffer.len()
    }
}
