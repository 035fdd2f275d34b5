//! Error taxonomy for the transport layer.
//!
//! Mirrors the Corruption / Liveness / Resize decline / Overflow / Timeout /
//! Invalid state taxonomy. None of these variants trigger a panic or
//! `std::process::exit` on their own — the guard thread
//! (`frameserver-proto::guard`) is the one place the terminal teardown path
//! (clear `dms`, post all semaphores, emit TERMINATED) actually runs.

/// Convenience alias for fallible transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors surfaced by the shared page, semaphore set, and rings.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Requested region size is zero, overflowed, or misaligned.
    #[error("invalid capacity: requested {requested}, minimum {minimum}")]
    InvalidCapacity {
        /// Size that was requested, in bytes.
        requested: usize,
        /// Minimum acceptable size, in bytes.
        minimum: usize,
    },

    /// Allocation or mapping of the shared region failed.
    #[error("failed to allocate shared region of {size} bytes aligned to {alignment}")]
    AllocationFailed {
        /// Requested size in bytes.
        size: usize,
        /// Requested alignment in bytes.
        alignment: usize,
    },

    /// Cookie, version, or bounds mismatch on `integrity_check`. Terminal.
    #[error("shared page corrupted: {0}")]
    Corruption(&'static str),

    /// Child process gone or parent pid invalid. Terminal, same path as
    /// [`TransportError::Corruption`].
    #[error("liveness check failed: {0}")]
    Liveness(&'static str),

    /// Geometry or buffer-size proposal violated configured bounds.
    /// Recoverable: the parent clears `resized` without changing geometry.
    #[error("resize declined: {0}")]
    ResizeDeclined(&'static str),

    /// Event ring or audio staging buffer is full. Local, non-terminal.
    #[error("{0} overflow: buffer is full")]
    Overflow(&'static str),

    /// A semaphore wait exceeded its timeout.
    #[error("semaphore wait timed out after {millis}ms")]
    Timeout {
        /// Requested timeout, in milliseconds.
        millis: u32,
    },
}

impl TransportError {
    /// True for conditions base spec §7 classifies as terminal (Corruption,
    /// Liveness): the caller must rebind the source's feed to the no-op
    /// dummy feed and let the guard thread run the teardown path.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransportError::Corruption(_) | TransportError::Liveness(_)
        )
    }
}
