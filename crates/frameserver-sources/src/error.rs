//! Error taxonomy for per-source control. Wraps the lower layers'
//! `TransportError`/`ProtoError` and adds the invalid-state category that
//! only makes sense once a source record exists.

use crate::playstate::Playstate;

/// Convenience alias for fallible source-control operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors surfaced by per-source lifecycle and control operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A transport-level error (corruption, liveness, resize decline, ...).
    #[error(transparent)]
    Transport(#[from] frameserver_transport::TransportError),

    /// A protocol-level error (handshake, key validation, ...).
    #[error(transparent)]
    Proto(#[from] frameserver_proto::ProtoError),

    /// Base spec §7's "Invalid state" category: an operation was attempted
    /// against a source in a playstate that does not accept it. Returned
    /// to the caller with no side effects.
    #[error("cannot transition from {from:?} to {to:?}")]
    UnacceptableState { from: Playstate, to: Playstate },

    /// The audio staging buffer overflowed before the consumer drained it.
    /// Local, non-terminal: the staging offset is reset and the frame is
    /// dropped (base spec §7).
    #[error("audio staging buffer overflow ({attempted} bytes into {capacity})")]
    AudioStagingOverflow { attempted: usize, capacity: usize },
}

impl SourceError {
    /// True for conditions base spec §7 classifies as terminal.
    pub fn is_terminal(&self) -> bool {
        match self {
            SourceError::Transport(inner) => inner.is_terminal(),
            SourceError::Proto(frameserver_proto::ProtoError::Transport(inner)) => {
                inner.is_terminal()
            }
            _ => false,
        }
    }
}
