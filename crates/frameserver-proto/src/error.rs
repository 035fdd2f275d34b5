//! Error type for the handshake, resize negotiation, and guard thread.

/// Convenience alias for fallible protocol operations.
pub type ProtoResult<T> = Result<T, ProtoError>;

/// Errors surfaced above the raw transport layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// A transport-level error (corruption, liveness, resize decline, ...).
    #[error(transparent)]
    Transport(#[from] frameserver_transport::TransportError),

    /// The key passed to `acquire`/`create` exceeds the 32-char limit base
    /// spec §6 places on connection keys.
    #[error("connection key {key:?} exceeds the 32-character limit")]
    KeyTooLong {
        /// The offending key.
        key: String,
    },

    /// The handshake's synchronous wait on V did not complete before the
    /// caller's deadline.
    #[error("handshake timed out waiting on the video semaphore")]
    HandshakeTimedOut,

    /// An operation was attempted against a source in a state that does not
    /// accept it (e.g. resume on a terminated source). Base spec §7's
    /// "Invalid state" category; returned with no side effects.
    #[error("operation not valid in current state: {0}")]
    UnacceptableState(&'static str),
}
