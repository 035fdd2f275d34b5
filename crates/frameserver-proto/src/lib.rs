//! Event payload schema, connection handshake, resize negotiation, and
//! guard thread for the frameserver protocol.
//!
//! Built on top of `frameserver-transport`'s shared page, semaphore set,
//! and event rings. `frameserver-sources` and `frameserver-compositor`
//! depend on this crate for everything above raw bytes-on-a-page.

mod error;
mod event;
mod guard;
mod handshake;
mod resize;

pub use error::{ProtoError, ProtoResult};
pub use event::{
    pack, unpack, Category, Event, ExternalKind, ExternalPayload, FrameserverKind, IoKind,
    IoPayload, NetKind, NetPayload, TargetKind, TargetPayload,
};
pub use guard::{GuardThread, LivenessProbe, OsLivenessProbe, Side, TerminalReason};
pub use handshake::{acquire, create, key_path_exists, resolve_path, unlink, SpawnEnvelope, SpawnMode, MAX_KEY_LEN};
pub use resize::{negotiate, request, NegotiationOutcome};
